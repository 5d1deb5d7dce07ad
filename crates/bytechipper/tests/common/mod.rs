#![allow(dead_code)]

use std::collections::HashSet;

use bytechipper::{MergeTable, SymbolId, engine::merge_bytes};
use proptest::prelude::*;

/// A valid table over ``a..=d`` from selector seeds.
pub fn table_from_seeds(seeds: &[(usize, usize)]) -> MergeTable {
    let mut symbols: Vec<SymbolId> = (b'a'..=b'd').map(|b| b as SymbolId).collect();
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for &(l, r) in seeds {
        let pair = (symbols[l % symbols.len()], symbols[r % symbols.len()]);
        if seen.insert(pair) {
            pairs.push(pair);
            symbols.push(255 + pairs.len() as SymbolId);
        }
    }
    MergeTable::build(pairs).unwrap()
}

pub fn arb_table(max_rules: usize) -> impl Strategy<Value = MergeTable> {
    prop::collection::vec((0..64usize, 0..64usize), 0..=max_rules)
        .prop_map(|seeds| table_from_seeds(&seeds))
}

pub fn arb_input(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            8 => b'a'..=b'd',
            1 => any::<u8>(),
        ],
        0..=max_len,
    )
}

/// The single-pass reference for `input`.
pub fn unchunked(
    table: &MergeTable,
    input: &[u8],
) -> Vec<SymbolId> {
    merge_bytes(table, input)
}
