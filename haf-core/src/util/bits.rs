/// MSB-first bit packer. The final byte is zero-padded.
#[derive(Default, Debug)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_count: u64,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            bytes: Vec::new(),
            bit_count: 0,
        }
    }

    pub fn with_capacity(bytes: usize) -> Self {
        BitWriter {
            bytes: Vec::with_capacity(bytes),
            bit_count: 0,
        }
    }

    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    pub fn push_bit(&mut self, bit: bool) {
        let bit_offset = (self.bit_count % 8) as u32;
        if bit_offset == 0 {
            self.bytes.push(0);
        }
        if bit {
            // len() >= 1 here: a byte was pushed when bit_offset was 0
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 1 << (7 - bit_offset);
        }
        self.bit_count += 1;
    }

    /// Push the low `len` bits of `code`, most significant first.
    pub fn push_bits(&mut self, code: u128, len: u8) {
        for bit_pos in (0..len).rev() {
            self.push_bit((code >> bit_pos) & 1 == 1);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Cursor over a packed bit slice, reading MSB-first.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: u64,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        BitReader { bytes, pos: 0 }
    }

    pub fn read_bit(&mut self) -> Option<bool> {
        let byte = *self.bytes.get((self.pos / 8) as usize)?;
        let bit = (byte >> (7 - (self.pos % 8) as u32)) & 1 == 1;
        self.pos += 1;
        Some(bit)
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn total_bits(&self) -> u64 {
        self.bytes.len() as u64 * 8
    }

    /// Bytes touched so far, counting a partially read byte as whole.
    pub fn bytes_consumed(&self) -> usize {
        self.pos.div_ceil(8) as usize
    }

    /// True when every bit after the cursor, up to the end of the current byte, is zero.
    pub fn padding_is_zero(&self) -> bool {
        let rem = (self.pos % 8) as u32;
        if rem == 0 {
            return true;
        }
        match self.bytes.get((self.pos / 8) as usize) {
            Some(byte) => byte & (0xFFu8 >> rem) == 0,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_msb_first_with_zero_padding() {
        let mut w = BitWriter::new();
        w.push_bits(0b101, 3);
        w.push_bits(0b1, 1);
        assert_eq!(w.bit_count(), 4);
        assert_eq!(w.into_bytes(), vec![0b1011_0000]);
    }

    #[test]
    fn reader_stops_at_end() {
        let bytes = [0b1000_0001];
        let mut r = BitReader::new(&bytes);
        let bits: Vec<bool> = std::iter::from_fn(|| r.read_bit()).collect();
        assert_eq!(bits.len(), 8);
        assert!(bits[0] && bits[7]);
        assert!(!bits[1..7].iter().any(|b| *b));
        assert_eq!(r.read_bit(), None);
    }

    #[test]
    fn padding_check() {
        let bytes = [0b1100_0000];
        let mut r = BitReader::new(&bytes);
        r.read_bit();
        r.read_bit();
        assert!(r.padding_is_zero());
        assert_eq!(r.bytes_consumed(), 1);

        let dirty = [0b1100_0100];
        let mut r = BitReader::new(&dirty);
        r.read_bit();
        r.read_bit();
        assert!(!r.padding_is_zero());
    }
}
