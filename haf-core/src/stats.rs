use crate::container::manifest::FileRecord;
use crate::domain::ratio;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub files: u64,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub compression_ratio: f32,
}

impl ArchiveStats {
    pub fn from_records(records: &[FileRecord]) -> Self {
        let original_bytes = records
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.original_size));
        let compressed_bytes = records
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.compressed_size));
        Self {
            files: records.len() as u64,
            original_bytes,
            compressed_bytes,
            compression_ratio: ratio(original_bytes, compressed_bytes),
        }
    }
}
