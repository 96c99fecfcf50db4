//! Huffman body codec.
//!
//! Body layout: `tree_len: u32 LE | tree | payload`, where `tree` is the
//! pre-order shape from [`HuffmanTree::serialize`] and `payload` holds the
//! MSB-first codes of every input byte, zero-padded to a byte boundary.
//! The symbol count is not stored in the body; it is the file's original
//! size from the manifest.

use super::{CodecId, Compressor};
use crate::error::{HafError, Result};
use crate::huffman::freq::FrequencyTable;
use crate::huffman::tree::HuffmanTree;
use crate::util::bits::{BitReader, BitWriter};
use std::io::Write;

const TREE_LEN_BYTES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub tree: Vec<u8>,
    pub payload: Vec<u8>,
}

impl EncodedBody {
    /// Framed size on disk.
    pub fn len(&self) -> u64 {
        (TREE_LEN_BYTES + self.tree.len() + self.payload.len()) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty() && self.payload.is_empty()
    }

    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(&(self.tree.len() as u32).to_le_bytes())?;
        w.write_all(&self.tree)?;
        w.write_all(&self.payload)?;
        Ok(())
    }

    /// Split a framed body into `(tree, payload)` without copying.
    pub fn split(body: &[u8]) -> Result<(&[u8], &[u8])> {
        if body.len() < TREE_LEN_BYTES {
            return Err(HafError::corrupt_stream("body shorter than its header"));
        }
        let (len_bytes, rest) = body.split_at(TREE_LEN_BYTES);
        let mut le = [0u8; TREE_LEN_BYTES];
        le.copy_from_slice(len_bytes);
        let tree_len = u32::from_le_bytes(le) as usize;
        if tree_len > rest.len() {
            return Err(HafError::corrupt_stream(format!(
                "code tree length {tree_len} exceeds body"
            )));
        }
        Ok(rest.split_at(tree_len))
    }
}

pub fn encode(data: &[u8]) -> Result<EncodedBody> {
    let freq = FrequencyTable::of(data);
    let tree = HuffmanTree::build(&freq);
    let codes = tree.codes();

    let bits: u64 = codes
        .iter()
        .map(|(b, c)| freq.get(b) * c.len as u64)
        .sum();
    let mut w = BitWriter::with_capacity(bits.div_ceil(8) as usize);
    for &b in data {
        let code = codes
            .get(b)
            .ok_or_else(|| HafError::InvalidInput(format!("byte {b} missing from code table")))?;
        w.push_bits(code.bits, code.len);
    }
    tracing::trace!(
        symbols = data.len(),
        distinct = freq.distinct(),
        bits = w.bit_count(),
        "huffman encode"
    );

    Ok(EncodedBody {
        tree: tree.serialize(),
        payload: w.into_bytes(),
    })
}

pub fn decode(tree: &[u8], payload: &[u8], expected_symbols: u64) -> Result<Vec<u8>> {
    let tree = HuffmanTree::deserialize(tree)?;

    if expected_symbols == 0 {
        if !tree.is_empty() || !payload.is_empty() {
            return Err(HafError::corrupt_stream("empty file carries a code tree or payload"));
        }
        return Ok(Vec::new());
    }
    // every symbol costs at least one bit
    if expected_symbols > payload.len() as u64 * 8 {
        return Err(HafError::corrupt_stream(format!(
            "payload of {} bytes cannot hold {expected_symbols} symbols",
            payload.len()
        )));
    }

    let mut r = BitReader::new(payload);
    let mut out = Vec::with_capacity(expected_symbols as usize);
    for _ in 0..expected_symbols {
        out.push(tree.decode_symbol(&mut r)?);
    }

    if r.bytes_consumed() != payload.len() {
        return Err(HafError::corrupt_stream("trailing bytes after payload"));
    }
    if !r.padding_is_zero() {
        return Err(HafError::corrupt_stream("non-zero padding bits"));
    }
    Ok(out)
}

pub struct HuffmanCompressor;

impl Compressor for HuffmanCompressor {
    fn id(&self) -> CodecId {
        CodecId::Huffman
    }

    fn compress(&self, data: &[u8], dst: &mut dyn Write) -> Result<u64> {
        let body = encode(data)?;
        body.write_to(dst)?;
        Ok(body.len())
    }

    fn decompress(&self, body: &[u8], original_size: u64) -> Result<Vec<u8>> {
        let (tree, payload) = EncodedBody::split(body)?;
        decode(tree, payload, original_size)
    }
}
