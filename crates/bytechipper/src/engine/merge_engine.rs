//! # Priority-merge BPE engine.
//!
//! Uses a binary min-heap over a doubly-linked list for O(n log n) BPE merging.
//!
//! Merges are applied in ``(rank, position)`` order: the lowest-rank pair
//! first, and the leftmost occurrence among pairs of equal rank. A merged
//! symbol can only take part in higher-rank rules, so this order is
//! exactly "lowest rank first, left to right, non-overlapping".

use std::{cmp::Reverse, collections::BinaryHeap};

use crate::{
    table::MergeTable,
    types::{Rank, SymbolId},
};

const NONE: usize = usize::MAX;

struct Node {
    symbol: SymbolId,
    prev: usize,
    next: usize,
}

/// Heap entry representing a potential merge.
///
/// Ordered by (rank, `left_idx`) so the lowest-rank, leftmost pair is popped first.
/// `left_sym` and `right_sym` are stored for O(1) stale-entry detection.
#[derive(Eq)]
struct MergeEntry {
    rank: Rank,
    left_idx: usize,
    left_sym: SymbolId,
    right_sym: SymbolId,
    merged: SymbolId,
}

impl PartialEq for MergeEntry {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.rank == other.rank && self.left_idx == other.left_idx
    }
}

impl Ord for MergeEntry {
    fn cmp(
        &self,
        other: &Self,
    ) -> core::cmp::Ordering {
        self.rank
            .cmp(&other.rank)
            .then(self.left_idx.cmp(&other.left_idx))
    }
}

impl PartialOrd for MergeEntry {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Reusable BPE merge engine.
///
/// Holds scratch buffers only; the [`MergeTable`] is passed per call,
/// so one engine per worker thread is enough.
#[derive(Default)]
pub struct MergeEngine {
    nodes: Vec<Node>,
    heap: BinaryHeap<Reverse<MergeEntry>>,
}

impl core::fmt::Debug for MergeEngine {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        f.debug_struct("MergeEngine").finish()
    }
}

impl Clone for MergeEngine {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl MergeEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge raw bytes, appending the merged symbols to `tokens`.
    ///
    /// ## Arguments
    /// * `table` - the merge table.
    /// * `bytes` - the input bytes; each byte is promoted to its own symbol.
    /// * `tokens` - the output buffer.
    pub fn merge_bytes_into(
        &mut self,
        table: &MergeTable,
        bytes: &[u8],
        tokens: &mut Vec<SymbolId>,
    ) {
        self.merge_into(
            table,
            bytes.len(),
            bytes.iter().map(|&b| b as SymbolId),
            tokens,
        )
    }

    /// Merge a symbol sequence, appending the merged symbols to `tokens`.
    ///
    /// ## Arguments
    /// * `table` - the merge table.
    /// * `symbols` - the input symbols.
    /// * `tokens` - the output buffer.
    pub fn merge_symbols_into(
        &mut self,
        table: &MergeTable,
        symbols: &[SymbolId],
        tokens: &mut Vec<SymbolId>,
    ) {
        self.merge_into(table, symbols.len(), symbols.iter().copied(), tokens)
    }

    fn push_candidate(
        &mut self,
        table: &MergeTable,
        left_idx: usize,
        left_sym: SymbolId,
        right_sym: SymbolId,
    ) {
        if let Some((merged, rank)) = table.lookup(left_sym, right_sym) {
            self.heap.push(Reverse(MergeEntry {
                rank,
                left_idx,
                left_sym,
                right_sym,
                merged,
            }));
        }
    }

    fn merge_into<I>(
        &mut self,
        table: &MergeTable,
        n: usize,
        symbols: I,
        tokens: &mut Vec<SymbolId>,
    ) where
        I: Iterator<Item = SymbolId>,
    {
        if n < 2 || table.is_empty() {
            tokens.extend(symbols);
            return;
        }

        // Build doubly-linked list of symbols.
        self.nodes.clear();
        self.nodes.reserve(n);
        for (i, symbol) in symbols.enumerate() {
            self.nodes.push(Node {
                symbol,
                prev: if i == 0 { NONE } else { i - 1 },
                next: if i + 1 < n { i + 1 } else { NONE },
            });
        }

        // Seed the heap with all initially-mergeable adjacent pairs.
        self.heap.clear();
        for i in 0..(n - 1) {
            let left_sym = self.nodes[i].symbol;
            let right_sym = self.nodes[i + 1].symbol;
            self.push_candidate(table, i, left_sym, right_sym);
        }

        while let Some(Reverse(entry)) = self.heap.pop() {
            let li = entry.left_idx;

            let ri = self.nodes[li].next;
            if ri == NONE {
                continue;
            }

            // Bidirectional adjacency + symbol freshness.
            if self.nodes[ri].prev != li
                || self.nodes[li].symbol != entry.left_sym
                || self.nodes[ri].symbol != entry.right_sym
            {
                continue;
            }

            // Left absorbs right.
            let merged = entry.merged;
            self.nodes[li].symbol = merged;
            let right_next = self.nodes[ri].next;
            self.nodes[li].next = right_next;
            if right_next != NONE {
                self.nodes[right_next].prev = li;
            }

            let left_prev = self.nodes[li].prev;
            if left_prev != NONE {
                let prev_sym = self.nodes[left_prev].symbol;
                self.push_candidate(table, left_prev, prev_sym, merged);
            }
            if right_next != NONE {
                let next_sym = self.nodes[right_next].symbol;
                self.push_candidate(table, li, merged, next_sym);
            }
        }

        let mut idx = 0;
        while idx != NONE {
            tokens.push(self.nodes[idx].symbol);
            idx = self.nodes[idx].next;
        }
    }
}

/// Merge raw bytes with a fresh engine.
pub fn merge_bytes(
    table: &MergeTable,
    bytes: &[u8],
) -> Vec<SymbolId> {
    let mut tokens = Vec::with_capacity(bytes.len());
    MergeEngine::new().merge_bytes_into(table, bytes, &mut tokens);
    tokens
}

/// Merge a symbol sequence with a fresh engine.
pub fn merge_symbols(
    table: &MergeTable,
    symbols: &[SymbolId],
) -> Vec<SymbolId> {
    let mut tokens = Vec::with_capacity(symbols.len());
    MergeEngine::new().merge_symbols_into(table, symbols, &mut tokens);
    tokens
}
