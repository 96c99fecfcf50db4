use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecId {
    Store = 0,
    Huffman = 1,
}

/// Turns one file's content into a self-contained body and back.
pub trait Compressor: Send + Sync {
    fn id(&self) -> CodecId;
    /// Writes the body for `data` and returns its length in bytes.
    fn compress(&self, data: &[u8], dst: &mut dyn Write) -> Result<u64>;
    /// Decodes a whole body into exactly `original_size` bytes.
    fn decompress(&self, body: &[u8], original_size: u64) -> Result<Vec<u8>>;
}

pub fn compressor_for(id: CodecId) -> &'static dyn Compressor {
    match id {
        CodecId::Store => &store::Store,
        CodecId::Huffman => &huffman::HuffmanCompressor,
    }
}

pub mod huffman;
pub mod store;
