/// Runner-assigned job identifier, unique per process and increasing from 1.
pub type JobId = u64;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    Archive,
    Unarchive,
}

impl JobKind {
    pub fn verb(self) -> &'static str {
        match self {
            JobKind::Archive => "archiving",
            JobKind::Unarchive => "unarchiving",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Append a new line for the job.
    Progress(String),
    /// Rewrite the job's most recently appended line.
    ProgressReplace(String),
    Error(String),
    Cancelled,
    Finished,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobEvent {
    pub job: JobId,
    pub job_kind: JobKind,
    pub kind: EventKind,
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Error(_) | EventKind::Cancelled | EventKind::Finished
        )
    }

    /// Human-readable outcome of a terminal event.
    pub fn status_line(&self) -> Option<String> {
        match &self.kind {
            EventKind::Finished => Some(format!("{} completed", self.job_kind.verb())),
            EventKind::Cancelled => Some(format!("{} cancelled", self.job_kind.verb())),
            EventKind::Error(msg) => Some(msg.clone()),
            EventKind::Progress(_) | EventKind::ProgressReplace(_) => None,
        }
    }
}
