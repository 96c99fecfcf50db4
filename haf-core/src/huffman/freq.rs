/// Byte histogram of one file's content.
#[derive(Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; 256],
}

impl FrequencyTable {
    pub fn of(bytes: &[u8]) -> Self {
        let mut counts = [0u64; 256];
        for &b in bytes {
            counts[b as usize] += 1;
        }
        Self { counts }
    }

    pub fn from_counts(counts: [u64; 256]) -> Self {
        Self { counts }
    }

    pub fn get(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Number of byte values that occur at least once.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|c| **c > 0).count()
    }

    /// `(byte, count)` pairs with a nonzero count, in ascending byte order.
    pub fn nonzero(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(b, c)| (b as u8, *c))
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self { counts: [0; 256] }
    }
}

impl std::fmt::Debug for FrequencyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.nonzero()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_bytes() {
        let t = FrequencyTable::of(b"abracadabra");
        assert_eq!(t.get(b'a'), 5);
        assert_eq!(t.get(b'b'), 2);
        assert_eq!(t.get(b'z'), 0);
        assert_eq!(t.distinct(), 5);
        assert_eq!(t.total(), 11);
        let order: Vec<u8> = t.nonzero().map(|(b, _)| b).collect();
        assert_eq!(order, b"abcdr".to_vec());
    }
}
