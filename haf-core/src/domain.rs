use crate::codec::CodecId;
use crate::container::manifest::FileRecord;
use time::OffsetDateTime;
use time::macros::format_description;

/// One archive entry, shaped for a table view.
#[derive(Clone, Debug, PartialEq)]
pub struct FileRow {
    pub name: String,
    pub codec: CodecId,
    pub original_size: u64,
    pub compressed_size: u64,
    /// compressed / original; 1.0 for empty files
    pub ratio: f32,
    pub modified: String,
}

impl From<&FileRecord> for FileRow {
    fn from(rec: &FileRecord) -> Self {
        Self {
            name: rec.name.clone(),
            codec: rec.codec,
            original_size: rec.original_size,
            compressed_size: rec.compressed_size,
            ratio: ratio(rec.original_size, rec.compressed_size),
            modified: format_mtime(rec.modified),
        }
    }
}

pub(crate) fn ratio(original: u64, compressed: u64) -> f32 {
    if original == 0 {
        1.0
    } else {
        (compressed as f64 / original as f64) as f32
    }
}

/// `YYYY-MM-DD hh:mm:ss` in UTC, or the raw seconds if out of range.
pub fn format_mtime(secs: i64) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()
        .and_then(|t| t.format(fmt).ok())
        .unwrap_or_else(|| secs.to_string())
}
