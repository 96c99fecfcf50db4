#![forbid(unsafe_code)]

pub mod error;
pub mod progress;

pub mod util {
    pub mod bits;
    pub mod sanitize;
}

pub mod huffman {
    pub mod freq;
    pub mod tree;
}

pub mod codec;

pub mod container {
    pub mod manifest;
    pub mod superblock;
}

pub mod pack {
    pub mod writer;
}

pub mod read {
    pub mod extract;
    pub mod opened;
}

pub mod jobs {
    pub mod event;
    pub mod log;
    pub mod runner;
}

pub mod domain;
pub mod list;
pub mod repo;
pub mod repo_fs;
pub mod stats;

// Re-exports: stable API surface
pub use container::manifest::FileRecord;
pub use error::{HafError, Result};
pub use jobs::event::{EventKind, JobEvent, JobId, JobKind, JobState};
pub use jobs::log::ProgressLog;
pub use jobs::runner::{JobRunner, RunnerOptions};
pub use list::list_contents;
pub use pack::writer::{PackOptions, create};
pub use read::extract::{extract_all, extract_file, verify};
pub use read::opened::HafReader;
