//! # Boundary Reconciliation
//!
//! Two symbol sequences, each merged in isolation, are stitched into the
//! sequence a single pass over their concatenated bytes would produce.
//!
//! ## Cut safety
//!
//! While no merge crosses the cut, each side of a single pass evolves
//! exactly as it does in isolation. The rightmost symbol of the left side
//! walks up the right spine of the final left token; the leftmost symbol
//! of the right side walks up the left spine of the final right token.
//! Replaying both spines in ``(rank, position)`` order shows whether some
//! cross pair would fire before either member is consumed.
//!
//! ## Windows
//!
//! When the cut is unsafe, the last `kl` left tokens and first `kr` right
//! tokens are expanded to bytes and re-merged. A token boundary of a merged
//! sequence splits it into two independently merged sequences, so if both
//! window edges are safe the splice is exact. A failing edge doubles its
//! side of the window; at worst the window grows to cover both inputs.

use core::num::NonZeroUsize;

use crate::{
    engine::MergeEngine,
    errors::BCResult,
    table::MergeTable,
    types::{Rank, SymbolId},
};

/// The default initial window, in tokens per side.
pub const DEFAULT_RECONCILE_WINDOW: usize = 8;

/// When a spine symbol is created, or replaced.
///
/// Variant order is time order; positions are byte offsets relative to the cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventTime {
    Start,
    At(Rank, i64),
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// The bottom-up creation history of the symbol adjacent to the cut.
fn edge_spine(
    table: &MergeTable,
    symbol: SymbolId,
    side: Side,
) -> Vec<(SymbolId, EventTime)> {
    let mut spine = Vec::new();
    let mut current = symbol;
    while let Some(rank) = table.rank_of(current) {
        let rule = table.rules()[rank as usize];
        let time = match side {
            Side::Left => EventTime::At(rank, -(table.symbol_len(current) as i64)),
            Side::Right => EventTime::At(rank, 0),
        };
        spine.push((current, time));
        current = match side {
            Side::Left => rule.right,
            Side::Right => rule.left,
        };
    }
    spine.push((current, EventTime::Start));
    spine.reverse();
    spine
}

/// Would a single pass over the concatenated bytes keep the cut between
/// `left` and `right`?
///
/// ## Arguments
/// * `table` - the merge table.
/// * `left` - the last token of an independently merged left sequence.
/// * `right` - the first token of an independently merged right sequence.
pub fn is_safe_cut(
    table: &MergeTable,
    left: SymbolId,
    right: SymbolId,
) -> bool {
    let ls = edge_spine(table, left, Side::Left);
    let rs = edge_spine(table, right, Side::Right);

    let (mut i, mut j) = (0, 0);
    loop {
        let (x, _) = ls[i];
        let (y, _) = rs[j];
        let end_l = ls.get(i + 1).map_or(EventTime::Never, |&(_, t)| t);
        let end_r = rs.get(j + 1).map_or(EventTime::Never, |&(_, t)| t);

        if let Some((_, rank)) = table.lookup(x, y) {
            let fires = EventTime::At(rank, -(table.symbol_len(x) as i64));
            if fires < end_l.min(end_r) {
                return false;
            }
        }

        match (end_l, end_r) {
            (EventTime::Never, EventTime::Never) => return true,
            _ if end_l <= end_r => i += 1,
            _ => j += 1,
        }
    }
}

/// A repair of an unsafe cut.
///
/// The stitched sequence is
/// ``left[..left_keep] ++ middle ++ right[right_skip..]``.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// The number of leading left tokens kept.
    pub left_keep: usize,

    /// The re-merged window.
    pub middle: Vec<SymbolId>,

    /// The number of leading right tokens replaced.
    pub right_skip: usize,
}

/// How a cut between two merged sequences is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutRepair {
    /// The cut is safe; the sequences concatenate.
    Safe,

    /// The cut is repaired by re-merging a window.
    Splice(Splice),

    /// The window must grow past the start of `left`; retry with more
    /// of the tokens before it.
    NeedsLeft,
}

/// Stitches independently merged sequences; reusable across boundaries.
#[derive(Debug, Clone)]
pub struct BoundaryReconciler {
    window: usize,
    engine: MergeEngine,
    bytes: Vec<u8>,
}

impl Default for BoundaryReconciler {
    fn default() -> Self {
        Self {
            window: DEFAULT_RECONCILE_WINDOW,
            engine: MergeEngine::default(),
            bytes: Vec::new(),
        }
    }
}

impl BoundaryReconciler {
    /// Create a reconciler with the given initial window.
    pub fn new(window: NonZeroUsize) -> Self {
        Self {
            window: window.get(),
            ..Default::default()
        }
    }

    /// The initial window, in tokens per side.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Compute the repair for the cut between `left` and `right`.
    ///
    /// `left` may be the tail of a longer merged sequence, whose token just
    /// before `left` is `before`.
    ///
    /// ## Returns
    /// [`CutRepair::NeedsLeft`] only when `before` is set, and the repair
    /// would reach past it.
    ///
    /// ## Errors
    /// [`crate::BytechipperError::InvalidTokenStream`] if a window token is unknown to `table`.
    pub fn repair(
        &mut self,
        table: &MergeTable,
        left: &[SymbolId],
        right: &[SymbolId],
        before: Option<SymbolId>,
    ) -> BCResult<CutRepair> {
        let Some(&r) = right.first() else {
            return Ok(CutRepair::Safe);
        };
        let Some(&l) = left.last() else {
            return Ok(match before {
                Some(prev) if !is_safe_cut(table, prev, r) => CutRepair::NeedsLeft,
                _ => CutRepair::Safe,
            });
        };
        if is_safe_cut(table, l, r) {
            return Ok(CutRepair::Safe);
        }

        let mut kl = self.window.min(left.len());
        let mut kr = self.window.min(right.len());
        loop {
            self.bytes.clear();
            table.try_expand_into(&left[left.len() - kl..], &mut self.bytes)?;
            table.try_expand_into(&right[..kr], &mut self.bytes)?;

            let mut middle = Vec::with_capacity(kl + kr);
            self.engine.merge_bytes_into(table, &self.bytes, &mut middle);

            let outer = match left.len() - kl {
                0 => before,
                keep => Some(left[keep - 1]),
            };
            let left_ok = match (outer, middle.first()) {
                (Some(prev), Some(&m)) => is_safe_cut(table, prev, m),
                _ => true,
            };
            let right_ok = match (right.get(kr), middle.last()) {
                (Some(&next), Some(&m)) => is_safe_cut(table, m, next),
                _ => true,
            };

            if left_ok && right_ok {
                return Ok(CutRepair::Splice(Splice {
                    left_keep: left.len() - kl,
                    middle,
                    right_skip: kr,
                }));
            }
            if !left_ok && kl == left.len() {
                return Ok(CutRepair::NeedsLeft);
            }

            if !left_ok {
                kl = (kl * 2).min(left.len());
            }
            if !right_ok {
                kr = (kr * 2).min(right.len());
            }
            log::trace!("widening reconcile window to ({kl}, {kr})");
        }
    }

    /// Append `right` to `stream`, repairing the cut between them.
    ///
    /// ## Returns
    /// `true` if the cut needed repair.
    pub fn reconcile_into(
        &mut self,
        table: &MergeTable,
        stream: &mut Vec<SymbolId>,
        right: &[SymbolId],
    ) -> BCResult<bool> {
        match self.repair(table, stream, right, None)? {
            CutRepair::Splice(splice) => {
                splice_into(stream, splice, right);
                Ok(true)
            }
            // Without a token before the stream, the window never runs out.
            CutRepair::Safe | CutRepair::NeedsLeft => {
                stream.extend_from_slice(right);
                Ok(false)
            }
        }
    }
}

/// Apply `splice` to `stream`, followed by the rest of `right`.
pub fn splice_into(
    stream: &mut Vec<SymbolId>,
    splice: Splice,
    right: &[SymbolId],
) {
    stream.truncate(splice.left_keep);
    stream.extend_from_slice(&splice.middle);
    stream.extend_from_slice(&right[splice.right_skip..]);
}

/// Stitch two independently merged sequences.
///
/// The result equals merging the concatenation of their byte expansions.
pub fn reconcile(
    table: &MergeTable,
    left: &[SymbolId],
    right: &[SymbolId],
) -> BCResult<Vec<SymbolId>> {
    let mut stream = left.to_vec();
    BoundaryReconciler::default().reconcile_into(table, &mut stream, right)?;
    Ok(stream)
}
