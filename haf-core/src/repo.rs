use crate::domain::FileRow;
use crate::error::Result;
use crate::stats::ArchiveStats;

/// Read-side view of one archive for shells and viewers.
pub trait ArchiveRepo: Send + Sync {
    fn list_files(&self) -> Result<Vec<FileRow>>;

    /// Decoded content of the entry called `name`.
    fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    fn stats(&self) -> Result<ArchiveStats>;
}
