//! # Ranked Merge Table ``{ (a, b) -> (merged, rank) }``

use crate::{
    errors::{BCResult, MergeTableError},
    types::{
        BCHashMap,
        BYTE_SYMBOL_COUNT,
        Pair,
        RESERVED_SYMBOL_BASE,
        Rank,
        SymbolId,
        hash_map_with_capacity,
        is_byte_symbol,
    },
};

/// A single merge rule: ``(left, right) -> merged``.
///
/// The rule's rank is its position in the owning [`MergeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeRule {
    /// The left symbol.
    pub left: SymbolId,

    /// The right symbol.
    pub right: SymbolId,

    /// The merged symbol.
    pub merged: SymbolId,
}

impl MergeRule {
    /// Construct a rule.
    pub fn new(
        left: SymbolId,
        right: SymbolId,
        merged: SymbolId,
    ) -> Self {
        Self {
            left,
            right,
            merged,
        }
    }

    /// The ``(left, right)`` pair.
    pub fn pair(&self) -> Pair {
        (self.left, self.right)
    }
}

/// Validate an ordered rule list, producing the lookup indices.
///
/// - every pair is unique;
/// - every merged id is unique, ``>= 256``, and below [`RESERVED_SYMBOL_BASE`];
/// - every referenced symbol is a byte, or the merged id of an earlier rule.
///
/// The last constraint forbids cycles, and guarantees a merged symbol
/// only ever feeds higher-rank rules.
fn try_index_rules(
    rules: &[MergeRule]
) -> Result<(BCHashMap<Pair, (SymbolId, Rank)>, BCHashMap<SymbolId, Rank>), MergeTableError> {
    let mut pairs: BCHashMap<Pair, (SymbolId, Rank)> = hash_map_with_capacity(rules.len());
    let mut merged: BCHashMap<SymbolId, Rank> = hash_map_with_capacity(rules.len());

    for (rank, rule) in rules.iter().enumerate() {
        let rank = rank as Rank;

        if is_byte_symbol(rule.merged) || rule.merged >= RESERVED_SYMBOL_BASE {
            return Err(MergeTableError::ReservedMergedId {
                merged: rule.merged,
                rank,
            });
        }

        for symbol in [rule.left, rule.right] {
            if !is_byte_symbol(symbol) && !merged.contains_key(&symbol) {
                return Err(MergeTableError::UndefinedSymbol { symbol, rank });
            }
        }

        if let Some(&(_, first_rank)) = pairs.get(&rule.pair()) {
            return Err(MergeTableError::DuplicatePair {
                left: rule.left,
                right: rule.right,
                first_rank,
                rank,
            });
        }
        if let Some(&first_rank) = merged.get(&rule.merged) {
            return Err(MergeTableError::DuplicateMergedId {
                merged: rule.merged,
                first_rank,
                rank,
            });
        }

        pairs.insert(rule.pair(), (rule.merged, rank));
        merged.insert(rule.merged, rank);
    }

    Ok((pairs, merged))
}

/// Immutable ranked merge table.
///
/// Owns the ordered rule list, and the indices used by the engine:
/// - ``(left, right) -> (merged, rank)`` for pair lookup;
/// - ``merged -> rank`` for expansion back to bytes;
/// - per-rule expanded byte lengths.
///
/// Shared read-only between worker threads.
#[derive(Debug, Clone, Default)]
pub struct MergeTable {
    rules: Vec<MergeRule>,
    pairs: BCHashMap<Pair, (SymbolId, Rank)>,
    ranks: BCHashMap<SymbolId, Rank>,
    byte_lens: Vec<usize>,
    max_symbol_len: usize,
}

impl PartialEq for MergeTable {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.rules == other.rules
    }
}

impl Eq for MergeTable {}

impl MergeTable {
    /// Build a table from ordered pairs; merged id = ``256 + rank``.
    ///
    /// ## Arguments
    /// * `pairs` - the ``(left, right)`` pairs, in rank order.
    pub fn build<I>(pairs: I) -> BCResult<Self>
    where
        I: IntoIterator<Item = Pair>,
    {
        let rules = pairs
            .into_iter()
            .enumerate()
            .map(|(rank, (left, right))| {
                MergeRule::new(left, right, (BYTE_SYMBOL_COUNT + rank) as SymbolId)
            })
            .collect::<Vec<_>>();
        Self::build_rules(rules)
    }

    /// Build a table from ordered rules with explicit merged ids.
    ///
    /// ## Arguments
    /// * `rules` - the rules, in rank order.
    pub fn build_rules<I>(rules: I) -> BCResult<Self>
    where
        I: IntoIterator<Item = MergeRule>,
    {
        let rules: Vec<MergeRule> = rules.into_iter().collect();
        let (pairs, ranks) = try_index_rules(&rules)?;

        let mut byte_lens: Vec<usize> = Vec::with_capacity(rules.len());
        for rule in &rules {
            // Doubling chains outgrow usize after 64 rules; no input can hold such a symbol.
            let len = [rule.left, rule.right]
                .iter()
                .map(|s| match ranks.get(s) {
                    Some(&rank) => byte_lens[rank as usize],
                    None => 1,
                })
                .fold(0usize, usize::saturating_add);
            byte_lens.push(len);
        }
        let max_symbol_len = byte_lens.iter().copied().max().unwrap_or(1);

        Ok(Self {
            rules,
            pairs,
            ranks,
            byte_lens,
            max_symbol_len,
        })
    }

    /// The number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Is the table empty?
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rules, in rank order.
    pub fn rules(&self) -> &[MergeRule] {
        &self.rules
    }

    /// Look up a pair.
    ///
    /// ## Returns
    /// ``Some((merged, rank))`` if the table has a rule for the pair.
    #[inline(always)]
    pub fn lookup(
        &self,
        left: SymbolId,
        right: SymbolId,
    ) -> Option<(SymbolId, Rank)> {
        self.pairs.get(&(left, right)).copied()
    }

    /// The rank of the rule producing `symbol`; `None` for bytes and unknown ids.
    #[inline(always)]
    pub fn rank_of(
        &self,
        symbol: SymbolId,
    ) -> Option<Rank> {
        if is_byte_symbol(symbol) {
            return None;
        }
        self.ranks.get(&symbol).copied()
    }

    /// The rule producing `symbol`, if it is a merged symbol.
    pub fn rule_of(
        &self,
        symbol: SymbolId,
    ) -> Option<&MergeRule> {
        self.rank_of(symbol).map(|rank| &self.rules[rank as usize])
    }

    /// The number of input bytes `symbol` expands to.
    ///
    /// Unknown ids are treated as a single byte; lengths saturate at ``usize::MAX``.
    #[inline(always)]
    pub fn symbol_len(
        &self,
        symbol: SymbolId,
    ) -> usize {
        match self.rank_of(symbol) {
            Some(rank) => self.byte_lens[rank as usize],
            None => 1,
        }
    }

    /// The longest expansion, in bytes, of any symbol in the table.
    pub fn max_symbol_len(&self) -> usize {
        self.max_symbol_len
    }

    /// The largest symbol id this table can emit.
    pub fn max_symbol(&self) -> SymbolId {
        self.rules
            .iter()
            .map(|r| r.merged)
            .max()
            .unwrap_or(0)
            .max((BYTE_SYMBOL_COUNT - 1) as SymbolId)
    }

    /// Append the byte expansion of `symbols` to `bytes`.
    ///
    /// ## Errors
    /// [`crate::BytechipperError::InvalidTokenStream`] if a symbol is not known to this table.
    pub fn try_expand_into(
        &self,
        symbols: &[SymbolId],
        bytes: &mut Vec<u8>,
    ) -> BCResult<()> {
        let mut stack: Vec<SymbolId> = Vec::new();
        for &symbol in symbols {
            stack.push(symbol);
            while let Some(s) = stack.pop() {
                if is_byte_symbol(s) {
                    bytes.push(s as u8);
                } else if let Some(rule) = self.rule_of(s) {
                    stack.push(rule.right);
                    stack.push(rule.left);
                } else {
                    return Err(crate::BytechipperError::InvalidTokenStream(format!(
                        "symbol {s} is not defined by the merge table"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Expand symbols produced by this table back to bytes.
    pub fn try_expand(
        &self,
        symbols: &[SymbolId],
    ) -> BCResult<Vec<u8>> {
        let capacity = symbols
            .iter()
            .try_fold(0usize, |acc, &s| acc.checked_add(self.symbol_len(s)))
            .filter(|&n| n < isize::MAX as usize)
            .ok_or_else(|| {
                crate::BytechipperError::InvalidTokenStream(
                    "symbols expand past the addressable size".to_string(),
                )
            })?;
        let mut bytes = Vec::with_capacity(capacity);
        self.try_expand_into(symbols, &mut bytes)?;
        Ok(bytes)
    }
}
