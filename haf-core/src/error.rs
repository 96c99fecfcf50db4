use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HafError {
    #[error("cannot read source {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a .haf archive: {0}")]
    NotAnArchive(String),

    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u16),

    #[error("corrupt manifest: {0}")]
    CorruptManifest(String),

    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    #[error("cancelled")]
    Cancelled,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no such file in archive: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HafError {
    pub(crate) fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HafError::WriteFailed {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt_stream(msg: impl Into<String>) -> Self {
        HafError::CorruptStream(msg.into())
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, HafError>;
