use std::io::{Read, Write};

use crate::error::{HafError, Result};

pub const MAGIC: &[u8; 6] = b"HAFARC";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: u64 = 32;

/// Fixed-size archive header, little-endian:
/// magic(6) | version u16 | file_count u64 | manifest_len u64 | data_off u64
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub version: u16,
    /// Number of file records the manifest must contain
    pub file_count: u64,
    /// Byte length of the manifest (CBOR)
    pub manifest_len: u64,
    /// Absolute file offset where the data section starts (manifest end)
    pub data_off: u64,
}

impl Superblock {
    pub fn new(file_count: u64, manifest_len: u64) -> Self {
        Self {
            version: VERSION,
            file_count,
            manifest_len,
            data_off: HEADER_LEN + manifest_len,
        }
    }

    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&self.file_count.to_le_bytes())?;
        w.write_all(&self.manifest_len.to_le_bytes())?;
        w.write_all(&self.data_off.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> Result<Self> {
        let mut buf = [0u8; HEADER_LEN as usize];
        r.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                HafError::NotAnArchive("file shorter than the archive header".into())
            }
            _ => HafError::Io(e),
        })?;
        if &buf[..6] != MAGIC {
            return Err(HafError::NotAnArchive("missing HAFARC marker".into()));
        }
        let version = u16::from_le_bytes([buf[6], buf[7]]);
        if version != VERSION {
            return Err(HafError::UnsupportedVersion(version));
        }
        let sb = Self {
            version,
            file_count: le64(&buf[8..16]),
            manifest_len: le64(&buf[16..24]),
            data_off: le64(&buf[24..32]),
        };
        if Some(sb.data_off) != HEADER_LEN.checked_add(sb.manifest_len) {
            return Err(HafError::CorruptManifest(format!(
                "data offset {} does not follow a {}-byte manifest",
                sb.data_off, sb.manifest_len
            )));
        }
        Ok(sb)
    }
}

#[inline]
fn le64(x: &[u8]) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(x);
    u64::from_le_bytes(b)
}
