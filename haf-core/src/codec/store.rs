use super::{CodecId, Compressor};
use crate::error::{HafError, Result};
use std::io::Write;

pub struct Store;

impl Compressor for Store {
    fn id(&self) -> CodecId {
        CodecId::Store
    }

    fn compress(&self, data: &[u8], dst: &mut dyn Write) -> Result<u64> {
        dst.write_all(data)?;
        Ok(data.len() as u64)
    }

    fn decompress(&self, body: &[u8], original_size: u64) -> Result<Vec<u8>> {
        if body.len() as u64 != original_size {
            return Err(HafError::corrupt_stream(format!(
                "stored body is {} bytes, expected {original_size}",
                body.len()
            )));
        }
        Ok(body.to_vec())
    }
}
