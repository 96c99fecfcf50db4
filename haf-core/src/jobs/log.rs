use std::collections::HashMap;

use super::event::{EventKind, JobEvent, JobId};

/// Line-oriented rendering of a job event stream.
///
/// Keeps, per job, the index of the last line it appended so that
/// `ProgressReplace` can rewrite it in place while lines of other jobs
/// interleave around it.
#[derive(Debug, Default)]
pub struct ProgressLog {
    lines: Vec<String>,
    last_line: HashMap<JobId, usize>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event and return the index of the line it touched.
    pub fn apply(&mut self, ev: &JobEvent) -> usize {
        match &ev.kind {
            EventKind::Progress(text) => self.append(ev.job, text),
            EventKind::ProgressReplace(text) => match self.last_line.get(&ev.job) {
                Some(&idx) => {
                    self.lines[idx] = render(ev.job, text);
                    idx
                }
                None => self.append(ev.job, text),
            },
            EventKind::Error(_) | EventKind::Cancelled | EventKind::Finished => {
                self.last_line.remove(&ev.job);
                let status = ev.status_line().unwrap_or_default();
                self.lines.push(render(ev.job, &status));
                self.lines.len() - 1
            }
        }
    }

    fn append(&mut self, job: JobId, text: &str) -> usize {
        self.lines.push(render(job, text));
        let idx = self.lines.len() - 1;
        self.last_line.insert(job, idx);
        idx
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.last_line.clear();
    }
}

fn render(job: JobId, text: &str) -> String {
    format!("[{job}] {text}")
}
