use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{HafError, Result};
use crate::huffman::freq::FrequencyTable;
use crate::util::bits::BitReader;

pub type NodeId = usize;

/// Longest code a tree may produce; built trees over `u64` counts stay far below it.
pub const MAX_CODE_LEN: u8 = 128;

/// Upper bound on nodes in a tree over a byte alphabet (256 leaves + 255 internal).
pub const MAX_NODES: usize = 511;

const TAG_INTERNAL: u8 = 0x00;
const TAG_LEAF: u8 = 0x01;
const UNSET: NodeId = NodeId::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Leaf {
        symbol: u8,
        weight: u64,
    },
    Internal {
        weight: u64,
        left: NodeId,
        right: NodeId,
    },
}

impl Node {
    pub fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }
}

/// Minimum-redundancy code tree stored as an arena; internal nodes refer to children by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl HuffmanTree {
    /// Greedy merge of the two lightest nodes. Ties are broken by arena id:
    /// leaves are allocated in ascending symbol order and every merged node
    /// gets the next id, so the result depends only on the frequencies.
    pub fn build(freq: &FrequencyTable) -> Self {
        let mut nodes: Vec<Node> = freq
            .nonzero()
            .map(|(symbol, weight)| Node::Leaf { symbol, weight })
            .collect();
        if nodes.is_empty() {
            return Self::default();
        }

        let mut heap: BinaryHeap<Reverse<(u64, NodeId)>> = nodes
            .iter()
            .enumerate()
            .map(|(id, n)| Reverse((n.weight(), id)))
            .collect();

        while heap.len() > 1 {
            let (Some(Reverse((w1, left))), Some(Reverse((w2, right)))) = (heap.pop(), heap.pop())
            else {
                break;
            };
            let id = nodes.len();
            let weight = w1.saturating_add(w2);
            nodes.push(Node::Internal {
                weight,
                left,
                right,
            });
            heap.push(Reverse((weight, id)));
        }

        let root = heap.pop().map(|Reverse((_, id))| id);
        Self { nodes, root }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Code table from a root-to-leaf walk (left = 0, right = 1).
    /// A lone leaf gets the one-bit code `0`.
    pub fn codes(&self) -> CodeTable {
        let mut table = CodeTable::empty();
        let Some(root) = self.root else {
            return table;
        };
        if let Node::Leaf { symbol, .. } = self.nodes[root] {
            table.set(symbol, Code { bits: 0, len: 1 });
            return table;
        }

        let mut stack: Vec<(NodeId, u128, u8)> = vec![(root, 0, 0)];
        while let Some((id, bits, len)) = stack.pop() {
            match self.nodes[id] {
                Node::Leaf { symbol, .. } => table.set(symbol, Code { bits, len }),
                Node::Internal { left, right, .. } => {
                    stack.push((right, (bits << 1) | 1, len + 1));
                    stack.push((left, bits << 1, len + 1));
                }
            }
        }
        table
    }

    /// Read one symbol from `bits`, walking from the root until a leaf.
    pub fn decode_symbol(&self, bits: &mut BitReader<'_>) -> Result<u8> {
        let mut id = self
            .root
            .ok_or_else(|| HafError::corrupt_stream("symbol requested from an empty tree"))?;

        if let Node::Leaf { symbol, .. } = self.nodes[id] {
            return match bits.read_bit() {
                Some(false) => Ok(symbol),
                Some(true) => Err(HafError::corrupt_stream("invalid code for single-symbol tree")),
                None => Err(HafError::corrupt_stream("payload ended mid-symbol")),
            };
        }

        loop {
            match self.nodes[id] {
                Node::Leaf { symbol, .. } => return Ok(symbol),
                Node::Internal { left, right, .. } => {
                    let bit = bits
                        .read_bit()
                        .ok_or_else(|| HafError::corrupt_stream("payload ended mid-symbol"))?;
                    id = if bit { right } else { left };
                }
            }
        }
    }

    /// Pre-order shape: `0x00` for an internal node, `0x01 <symbol>` for a leaf.
    /// Weights are not stored; decoding only needs the shape.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            match self.nodes[id] {
                Node::Leaf { symbol, .. } => out.extend_from_slice(&[TAG_LEAF, symbol]),
                Node::Internal { left, right, .. } => {
                    out.push(TAG_INTERNAL);
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::default());
        }

        let mut nodes: Vec<Node> = Vec::new();
        let mut seen = [false; 256];
        // internal nodes still waiting for children, with their depth
        let mut open: Vec<(NodeId, u8)> = Vec::new();
        let mut pos = 0usize;

        loop {
            if nodes.len() >= MAX_NODES {
                return Err(HafError::corrupt_stream("code tree has too many nodes"));
            }
            let tag = *data
                .get(pos)
                .ok_or_else(|| HafError::corrupt_stream("code tree truncated"))?;
            pos += 1;

            let depth = match open.last() {
                Some(&(_, d)) => d + 1,
                None => 0,
            };
            if depth > MAX_CODE_LEN {
                return Err(HafError::corrupt_stream("code tree too deep"));
            }

            let id = nodes.len();
            match tag {
                TAG_LEAF => {
                    let symbol = *data
                        .get(pos)
                        .ok_or_else(|| HafError::corrupt_stream("code tree truncated"))?;
                    pos += 1;
                    if std::mem::replace(&mut seen[symbol as usize], true) {
                        return Err(HafError::corrupt_stream(format!(
                            "symbol {symbol} appears twice in code tree"
                        )));
                    }
                    nodes.push(Node::Leaf { symbol, weight: 0 });
                }
                TAG_INTERNAL => nodes.push(Node::Internal {
                    weight: 0,
                    left: UNSET,
                    right: UNSET,
                }),
                other => {
                    return Err(HafError::corrupt_stream(format!(
                        "bad code tree tag {other:#04x}"
                    )));
                }
            }

            if let Some(&(parent, _)) = open.last() {
                if let Node::Internal { left, right, .. } = &mut nodes[parent] {
                    if *left == UNSET {
                        *left = id;
                    } else {
                        *right = id;
                        open.pop();
                    }
                }
            }
            if tag == TAG_INTERNAL {
                open.push((id, depth));
            }
            if open.is_empty() {
                break;
            }
        }

        if pos != data.len() {
            return Err(HafError::corrupt_stream("trailing bytes after code tree"));
        }
        Ok(Self {
            nodes,
            root: Some(0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    /// Right-aligned: the last bit of the code is bit 0.
    pub bits: u128,
    pub len: u8,
}

impl Code {
    pub fn is_prefix_of(&self, other: &Code) -> bool {
        self.len <= other.len && (other.bits >> (other.len - self.len)) == self.bits
    }

    pub fn to_bits(&self) -> Vec<bool> {
        (0..self.len)
            .rev()
            .map(|i| (self.bits >> i) & 1 == 1)
            .collect()
    }
}

/// The "keys": per-byte codes derived from a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: [Option<Code>; 256],
}

impl CodeTable {
    fn empty() -> Self {
        Self { codes: [None; 256] }
    }

    fn set(&mut self, symbol: u8, code: Code) {
        self.codes[symbol as usize] = Some(code);
    }

    pub fn get(&self, symbol: u8) -> Option<Code> {
        self.codes[symbol as usize]
    }

    pub fn len(&self) -> usize {
        self.codes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, Code)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(b, c)| c.map(|c| (b as u8, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::bits::BitWriter;

    fn assert_prefix_free(table: &CodeTable) {
        let codes: Vec<(u8, Code)> = table.iter().collect();
        for (a, ca) in &codes {
            assert!(ca.len > 0, "zero-length code for {a}");
            for (b, cb) in &codes {
                if a != b {
                    assert!(!ca.is_prefix_of(cb), "{a} is a prefix of {b}");
                }
            }
        }
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        let tree = HuffmanTree::build(&FrequencyTable::of(b""));
        assert!(tree.is_empty());
        assert!(tree.codes().is_empty());
        assert!(tree.serialize().is_empty());
        let mut r = BitReader::new(&[0xFF]);
        assert!(matches!(tree.decode_symbol(&mut r), Err(HafError::CorruptStream(_))));
    }

    #[test]
    fn single_symbol_gets_one_bit() {
        let tree = HuffmanTree::build(&FrequencyTable::of(b"zzzz"));
        assert_eq!(tree.leaf_count(), 1);
        let codes = tree.codes();
        assert_eq!(codes.get(b'z'), Some(Code { bits: 0, len: 1 }));
        assert_eq!(codes.len(), 1);
    }

    #[test]
    fn strict_binary_shape() {
        let tree = HuffmanTree::build(&FrequencyTable::of(b"mississippi river"));
        let leaves = tree.leaf_count();
        assert_eq!(leaves, FrequencyTable::of(b"mississippi river").distinct());
        // strict binary tree: internal = leaves - 1
        assert_eq!(tree.node_count(), 2 * leaves - 1);
        let root = tree.root().unwrap();
        assert_eq!(tree.node(root).weight(), 17);
    }

    #[test]
    fn codes_are_prefix_free() {
        let samples: Vec<Vec<u8>> = vec![
            b"abracadabra".to_vec(),
            b"aaaaaaaabbbbccd".to_vec(),
            b"the quick brown fox jumps over the lazy dog".to_vec(),
            (0u8..=255).collect(),
        ];
        for sample in &samples {
            let tree = HuffmanTree::build(&FrequencyTable::of(sample));
            assert_prefix_free(&tree.codes());
        }

        // skewed (Fibonacci) weights produce the deepest trees
        let mut counts = [0u64; 256];
        let (mut a, mut b) = (1u64, 1u64);
        for c in counts.iter_mut().take(40) {
            *c = a;
            (a, b) = (b, a + b);
        }
        let tree = HuffmanTree::build(&FrequencyTable::from_counts(counts));
        let codes = tree.codes();
        assert_eq!(codes.len(), 40);
        assert_prefix_free(&codes);
    }

    #[test]
    fn heavier_symbols_get_shorter_codes() {
        let tree = HuffmanTree::build(&FrequencyTable::of(b"aaaaaaaabbbbccd"));
        let codes = tree.codes();
        let a = codes.get(b'a').unwrap().len;
        let d = codes.get(b'd').unwrap().len;
        assert!(a < d);
    }

    #[test]
    fn ties_break_the_same_way_every_time() {
        let freq = FrequencyTable::of(b"abcdefgh");
        let first = HuffmanTree::build(&freq);
        for _ in 0..10 {
            assert_eq!(HuffmanTree::build(&freq), first);
        }
        // equal weights: the lowest symbol ends up leftmost
        assert_eq!(first.codes().get(b'a').unwrap().to_bits(), vec![false; 3]);
    }

    #[test]
    fn serialized_shape_decodes_identically() {
        let data = b"she sells sea shells by the sea shore";
        let tree = HuffmanTree::build(&FrequencyTable::of(data));
        let back = HuffmanTree::deserialize(&tree.serialize()).unwrap();
        assert_eq!(back.codes(), tree.codes());
    }

    #[test]
    fn decode_symbol_walks_to_leaf() {
        let tree = HuffmanTree::build(&FrequencyTable::of(b"aab"));
        let codes = tree.codes();
        let mut w = BitWriter::new();
        for &b in b"baa" {
            let c = codes.get(b).unwrap();
            w.push_bits(c.bits, c.len);
        }
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let out: Vec<u8> = (0..3).map(|_| tree.decode_symbol(&mut r).unwrap()).collect();
        assert_eq!(out, b"baa");
    }

    #[test]
    fn decode_symbol_fails_when_bits_run_out() {
        let tree = HuffmanTree::build(&FrequencyTable::of(b"abcd"));
        let mut r = BitReader::new(&[]);
        assert!(matches!(tree.decode_symbol(&mut r), Err(HafError::CorruptStream(_))));
    }

    #[test]
    fn malformed_trees_are_rejected() {
        let cases: [&[u8]; 6] = [
            &[0x00],                         // internal node without children
            &[0x00, 0x01, b'a'],             // missing right child
            &[0x01],                         // leaf without symbol
            &[0x00, 0x01, b'a', 0x01, b'a'], // duplicate symbol
            &[0x01, b'a', 0x01, b'b'],       // trailing bytes
            &[0x07, b'a'],                   // unknown tag
        ];
        for case in cases {
            assert!(
                matches!(HuffmanTree::deserialize(case), Err(HafError::CorruptStream(_))),
                "accepted {case:?}"
            );
        }
    }

    #[test]
    fn overly_deep_tree_is_rejected() {
        // a right-leaning chain deeper than MAX_CODE_LEN
        let mut data = Vec::new();
        for i in 0..=(MAX_CODE_LEN as usize + 1) {
            data.push(0x00);
            data.extend_from_slice(&[0x01, i as u8]);
        }
        data.extend_from_slice(&[0x01, 0xFF]);
        assert!(HuffmanTree::deserialize(&data).is_err());
    }
}
