use haf_core::{HafError, JobId};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Haf(#[from] HafError),

    #[error("{} is a directory; pass --recursive to include its files", .0.display())]
    DirectoryInput(PathBuf),

    #[error("cannot walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("job {0} failed")]
    JobFailed(JobId),

    #[error("job {0} was cancelled")]
    JobCancelled(JobId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
