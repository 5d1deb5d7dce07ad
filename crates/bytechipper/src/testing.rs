//! # Test Utilities

use proptest::prelude::*;

use crate::{
    table::MergeTable,
    types::{BCHashSet, BYTE_SYMBOL_COUNT, SymbolId},
};

/// The byte alphabet random tables are built over.
///
/// Small, so that random inputs hit rules often.
pub const TEST_ALPHABET: core::ops::RangeInclusive<u8> = b'a'..=b'd';

/// Reference BPE: repeatedly merge every occurrence of the lowest-rank
/// pair, left to right, rescanning from scratch each round.
pub fn naive_merge(
    table: &MergeTable,
    bytes: &[u8],
) -> Vec<SymbolId> {
    let mut symbols: Vec<SymbolId> = bytes.iter().map(|&b| b as SymbolId).collect();

    loop {
        let best = symbols
            .windows(2)
            .filter_map(|w| table.lookup(w[0], w[1]))
            .map(|(_, rank)| rank)
            .min();
        let Some(rank) = best else {
            return symbols;
        };
        let rule = table.rules()[rank as usize];

        let mut next = Vec::with_capacity(symbols.len());
        let mut i = 0;
        while i < symbols.len() {
            if i + 1 < symbols.len() && symbols[i] == rule.left && symbols[i + 1] == rule.right {
                next.push(rule.merged);
                i += 2;
            } else {
                next.push(symbols[i]);
                i += 1;
            }
        }
        symbols = next;
    }
}

/// Build a valid table from selector seeds.
///
/// Each seed picks its left and right symbols (modulo) from the alphabet
/// plus every merged symbol defined so far; repeated pairs are skipped.
pub fn table_from_seeds(seeds: &[(usize, usize)]) -> MergeTable {
    let mut symbols: Vec<SymbolId> = TEST_ALPHABET.map(|b| b as SymbolId).collect();
    let mut seen: BCHashSet<(SymbolId, SymbolId)> = Default::default();
    let mut pairs = Vec::new();

    for &(l, r) in seeds {
        let pair = (symbols[l % symbols.len()], symbols[r % symbols.len()]);
        if seen.insert(pair) {
            pairs.push(pair);
            symbols.push((BYTE_SYMBOL_COUNT + pairs.len() - 1) as SymbolId);
        }
    }

    MergeTable::build(pairs).unwrap()
}

/// Strategy for random valid tables with up to `max_rules` rules.
pub fn arb_table(max_rules: usize) -> impl Strategy<Value = MergeTable> {
    prop::collection::vec((0..64usize, 0..64usize), 0..=max_rules)
        .prop_map(|seeds| table_from_seeds(&seeds))
}

/// Strategy for inputs drawn mostly from [`TEST_ALPHABET`].
pub fn arb_input(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            8 => TEST_ALPHABET,
            1 => any::<u8>(),
        ],
        0..=max_len,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_merge() {
        let table = MergeTable::build([(97, 98)]).unwrap();
        assert_eq!(naive_merge(&table, b"aab"), vec![97, 256]);
        assert_eq!(naive_merge(&table, b""), Vec::<SymbolId>::new());
    }

    #[test]
    fn test_table_from_seeds() {
        let table = table_from_seeds(&[(0, 1), (0, 1), (4, 4)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(97, 98), Some((256, 0)));
        assert_eq!(table.lookup(256, 256), Some((257, 1)));
    }
}
