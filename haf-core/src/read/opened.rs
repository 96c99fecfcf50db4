use crate::codec::compressor_for;
use crate::container::manifest::{FileRecord, Manifest};
use crate::container::superblock::{HEADER_LEN, Superblock};
use crate::error::{HafError, Result};
use std::{
    fs::File,
    io::{ErrorKind, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

/// An archive whose header and manifest have been read and checked.
///
/// Opening never touches the data section, so listing works on archives whose
/// bodies are damaged. Bodies are read and checked one record at a time.
pub struct HafReader {
    f: File,
    path: PathBuf,
    file_len: u64,
    pub sb: Superblock,
    pub manifest: Manifest,
}

impl HafReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut f = File::open(path)?;
        let file_len = f.metadata()?.len();

        let sb = Superblock::read_from(&mut f)?;
        if sb.data_off > file_len {
            return Err(HafError::CorruptManifest(format!(
                "manifest of {} bytes runs past the end of a {file_len}-byte file",
                sb.manifest_len
            )));
        }

        f.seek(SeekFrom::Start(HEADER_LEN))?;
        let mut mbytes = vec![0u8; sb.manifest_len as usize];
        f.read_exact(&mut mbytes)
            .map_err(|e| HafError::CorruptManifest(format!("manifest read: {e}")))?;
        let manifest = Manifest::from_cbor(&mbytes)?;
        manifest.validate(&sb)?;

        tracing::debug!(
            archive = %path.display(),
            files = manifest.files.len(),
            "opened archive"
        );
        Ok(Self {
            f,
            path: path.to_path_buf(),
            file_len,
            sb,
            manifest,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.manifest.files
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.manifest.files
    }

    pub fn find(&self, name: &str) -> Result<&FileRecord> {
        self.manifest
            .find(name)
            .ok_or_else(|| HafError::NotFound(name.to_string()))
    }

    /// Raw body bytes of `rec`, exactly `compressed_size` long.
    pub fn read_body(&mut self, rec: &FileRecord) -> Result<Vec<u8>> {
        let start = self
            .sb
            .data_off
            .checked_add(rec.body_off)
            .ok_or_else(|| HafError::corrupt_stream("body offset overflows"))?;
        let end = start.checked_add(rec.compressed_size);
        if end.is_none_or(|end| end > self.file_len) {
            return Err(HafError::corrupt_stream(format!(
                "body of {:?} runs past the end of the archive",
                rec.name
            )));
        }

        self.f.seek(SeekFrom::Start(start))?;
        let mut body = vec![0u8; rec.compressed_size as usize];
        self.f.read_exact(&mut body).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                HafError::corrupt_stream(format!("short read in body of {:?}", rec.name))
            }
            _ => HafError::Io(e),
        })?;
        Ok(body)
    }

    /// Decoded content of `rec`, checked against its size and hash.
    pub fn decode(&mut self, rec: &FileRecord) -> Result<Vec<u8>> {
        let body = self.read_body(rec)?;
        let data = compressor_for(rec.codec).decompress(&body, rec.original_size)?;
        if data.len() as u64 != rec.original_size {
            return Err(HafError::corrupt_stream(format!(
                "{:?} decoded to {} bytes, expected {}",
                rec.name,
                data.len(),
                rec.original_size
            )));
        }
        if *blake3::hash(&data).as_bytes() != rec.blake3 {
            return Err(HafError::corrupt_stream(format!(
                "content hash mismatch for {:?}",
                rec.name
            )));
        }
        Ok(data)
    }
}
