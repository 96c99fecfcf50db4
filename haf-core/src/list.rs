use crate::container::manifest::FileRecord;
use crate::error::Result;
use crate::read::opened::HafReader;
use std::path::Path;

/// Manifest records of `archive`, in archive order. Body bytes are never read.
pub fn list_contents(archive: &Path) -> Result<Vec<FileRecord>> {
    Ok(HafReader::open(archive)?.into_records())
}
