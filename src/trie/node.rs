//! Trie nodes and their branch tables
//!
//! A node adds `branch byte + prefix` to the string represented by its
//! parent. Children are indexed by the next byte of the topic, either in a
//! short sorted list (sparse) or in an array covering `[min, max]` (dense).

use smallvec::SmallVec;

use super::subscribers::SubscriberSet;

/// Index of a node in the trie arena
pub(crate) type NodeId = usize;

/// Longest prefix stored inline in one node
pub const PREFIX_MAX: usize = 8;

/// Most children a sparse branch table holds before turning dense
pub const SPARSE_MAX: usize = 8;

/// A dense table turns back to sparse once it holds this many children
const DENSE_SHRINK: usize = SPARSE_MAX / 2;

/// Inline prefix bytes
pub(crate) type Prefix = SmallVec<[u8; PREFIX_MAX]>;

/// Branch table of a node
#[derive(Debug, Clone)]
pub(crate) enum Children {
    /// Sorted `(byte, child)` pairs, at most `SPARSE_MAX` of them
    Sparse(SmallVec<[(u8, NodeId); SPARSE_MAX]>),
    /// `slots[b - min]` is the child for byte `b`
    Dense {
        min: u8,
        slots: Vec<Option<NodeId>>,
        live: usize,
    },
}

impl Default for Children {
    fn default() -> Self {
        Children::Sparse(SmallVec::new())
    }
}

impl Children {
    /// Table with exactly one child
    pub(crate) fn single(byte: u8, child: NodeId) -> Self {
        let mut entries = SmallVec::new();
        entries.push((byte, child));
        Children::Sparse(entries)
    }

    /// Number of live children
    pub(crate) fn len(&self) -> usize {
        match self {
            Children::Sparse(entries) => entries.len(),
            Children::Dense { live, .. } => *live,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_dense(&self) -> bool {
        matches!(self, Children::Dense { .. })
    }

    /// Child reached through `byte`
    pub(crate) fn get(&self, byte: u8) -> Option<NodeId> {
        match self {
            Children::Sparse(entries) => entries
                .binary_search_by_key(&byte, |&(b, _)| b)
                .ok()
                .map(|idx| entries[idx].1),
            Children::Dense { min, slots, .. } => {
                let offset = usize::from(byte.checked_sub(*min)?);
                slots.get(offset).copied().flatten()
            }
        }
    }

    /// The single child, if there is exactly one
    pub(crate) fn only_child(&self) -> Option<(u8, NodeId)> {
        if self.len() != 1 {
            return None;
        }
        self.entries().into_iter().next()
    }

    /// All `(byte, child)` pairs in byte order
    pub(crate) fn entries(&self) -> Vec<(u8, NodeId)> {
        match self {
            Children::Sparse(entries) => entries.to_vec(),
            Children::Dense { min, slots, .. } => slots
                .iter()
                .enumerate()
                .filter_map(|(offset, slot)| slot.map(|child| (*min + offset as u8, child)))
                .collect(),
        }
    }

    /// Add a child under `byte`
    ///
    /// # Panics
    ///
    /// Panics if `byte` already has a child.
    pub(crate) fn insert(&mut self, byte: u8, child: NodeId) {
        match self {
            Children::Sparse(entries) => {
                let idx = match entries.binary_search_by_key(&byte, |&(b, _)| b) {
                    Ok(_) => panic!("branch {:#04x} already occupied", byte),
                    Err(idx) => idx,
                };
                if entries.len() < SPARSE_MAX {
                    entries.insert(idx, (byte, child));
                } else {
                    let mut dense = Self::dense_from(entries);
                    dense.insert(byte, child);
                    *self = dense;
                }
            }
            Children::Dense { min, slots, live } => {
                if byte < *min {
                    let grow = usize::from(*min - byte);
                    slots.splice(0..0, std::iter::repeat(None).take(grow));
                    *min = byte;
                }
                let offset = usize::from(byte - *min);
                if offset >= slots.len() {
                    slots.resize(offset + 1, None);
                }
                assert!(
                    slots[offset].is_none(),
                    "branch {:#04x} already occupied",
                    byte
                );
                slots[offset] = Some(child);
                *live += 1;
            }
        }
    }

    /// Remove and return the child under `byte`
    pub(crate) fn remove(&mut self, byte: u8) -> Option<NodeId> {
        match self {
            Children::Sparse(entries) => {
                let idx = entries.binary_search_by_key(&byte, |&(b, _)| b).ok()?;
                Some(entries.remove(idx).1)
            }
            Children::Dense { min, slots, live } => {
                let offset = usize::from(byte.checked_sub(*min)?);
                let child = slots.get_mut(offset)?.take()?;
                *live -= 1;

                if *live <= DENSE_SHRINK {
                    let entries: SmallVec<[(u8, NodeId); SPARSE_MAX]> =
                        self.entries().into_iter().collect();
                    *self = Children::Sparse(entries);
                } else {
                    Self::trim(min, slots);
                }
                Some(child)
            }
        }
    }

    fn dense_from(entries: &[(u8, NodeId)]) -> Self {
        let (lo, hi) = entries
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &(b, _)| (lo.min(b), hi.max(b)));
        let mut slots = vec![None; usize::from(hi - lo) + 1];
        for &(b, child) in entries {
            slots[usize::from(b - lo)] = Some(child);
        }
        Children::Dense {
            min: lo,
            slots,
            live: entries.len(),
        }
    }

    /// Drop empty slots at both ends of a dense table
    fn trim(min: &mut u8, slots: &mut Vec<Option<NodeId>>) {
        while matches!(slots.last(), Some(None)) {
            slots.pop();
        }
        let leading = slots.iter().take_while(|slot| slot.is_none()).count();
        if leading > 0 {
            slots.drain(..leading);
            *min += leading as u8;
        }
    }
}

/// One node of the patricia trie
#[derive(Debug, Default)]
pub(crate) struct Node {
    /// Bytes this node adds after its branch byte
    pub(crate) prefix: Prefix,
    /// Subscriptions ending exactly here, with multiplicity
    pub(crate) refcount: u32,
    pub(crate) children: Children,
    pub(crate) subscribers: SubscriberSet,
}

impl Node {
    pub(crate) fn with_prefix(prefix: &[u8]) -> Self {
        assert!(prefix.len() <= PREFIX_MAX, "prefix longer than {}", PREFIX_MAX);
        Self {
            prefix: SmallVec::from_slice(prefix),
            ..Default::default()
        }
    }
}
