use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::codec::CodecId;
use crate::container::superblock::Superblock;
use crate::error::{HafError, Result};
use crate::util::sanitize::is_safe_entry_name;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Last path component of the source file
    pub name: String,
    pub codec: CodecId,
    pub original_size: u64,
    /// Length of the body in the data section
    pub compressed_size: u64,
    /// Source mtime, seconds since the Unix epoch
    pub modified: i64,
    /// Body offset relative to the start of the data section
    pub body_off: u64,
    /// blake3 of the original content
    pub blake3: [u8; 32],
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub created: i64,
    pub tool: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub files: Vec<FileRecord>,
    pub meta: Meta,
}

impl Manifest {
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        Ok(buf)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(bytes)
            .map_err(|e| HafError::CorruptManifest(format!("manifest decode: {e}")))
    }

    /// Structural checks that need nothing beyond the header and the manifest.
    pub fn validate(&self, sb: &Superblock) -> Result<()> {
        if self.files.len() as u64 != sb.file_count {
            return Err(HafError::CorruptManifest(format!(
                "header declares {} files, manifest holds {}",
                sb.file_count,
                self.files.len()
            )));
        }

        let mut expected_off = 0u64;
        let mut names = HashSet::with_capacity(self.files.len());
        for (i, fe) in self.files.iter().enumerate() {
            if !is_safe_entry_name(&fe.name) {
                return Err(HafError::CorruptManifest(format!(
                    "record {i} has unsafe name {:?}",
                    fe.name
                )));
            }
            if !names.insert(fe.name.as_str()) {
                return Err(HafError::CorruptManifest(format!(
                    "duplicate name {:?}",
                    fe.name
                )));
            }
            if fe.body_off != expected_off {
                return Err(HafError::CorruptManifest(format!(
                    "record {i} body at {} (expected {expected_off})",
                    fe.body_off
                )));
            }
            if fe.codec == CodecId::Store && fe.compressed_size != fe.original_size {
                return Err(HafError::CorruptManifest(format!(
                    "stored record {i} has mismatched sizes"
                )));
            }
            expected_off = expected_off
                .checked_add(fe.compressed_size)
                .ok_or_else(|| HafError::CorruptManifest("body offsets overflow".into()))?;
        }
        Ok(())
    }

    /// Total length of the data section implied by the records.
    pub fn data_len(&self) -> u64 {
        self.files.iter().map(|f| f.compressed_size).sum()
    }

    pub fn find(&self, name: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.name == name)
    }
}
