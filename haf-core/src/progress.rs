use std::path::Path;

use crate::error::{HafError, Result};

/// File-granularity milestones reported by the writer and the extractor.
/// `index` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    FileStarted {
        index: usize,
        total: usize,
        name: &'a str,
    },
    FileFinished {
        index: usize,
        total: usize,
        name: &'a str,
        original_size: u64,
        compressed_size: u64,
    },
    /// All bodies are done; the output is being made visible.
    Finalizing { path: &'a Path },
}

pub trait Progress {
    fn step(&mut self, step: Step<'_>);

    /// Polled between files.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Ignores every step and never cancels.
pub struct Silent;

impl Progress for Silent {
    fn step(&mut self, _: Step<'_>) {}
}

impl<F> Progress for F
where
    F: FnMut(Step<'_>),
{
    fn step(&mut self, step: Step<'_>) {
        self(step)
    }
}

pub(crate) fn checkpoint(progress: &dyn Progress) -> Result<()> {
    if progress.is_cancelled() {
        return Err(HafError::Cancelled);
    }
    Ok(())
}
