//! # Ordered Stream Assembly
//!
//! The assembler holds only a short tail of the stream. Older tokens are
//! final and go to a [`TokenSink`] as each chunk is joined; a repair
//! reaching past the tail takes them back from the sink.

use core::num::NonZeroUsize;

use crate::{
    chunking::Chunk,
    engine::MergeEngine,
    errors::{BCResult, BytechipperError},
    reconcile::{BoundaryReconciler, CutRepair, splice_into},
    stream::TokenSink,
    table::MergeTable,
    types::SymbolId,
};

/// The symbols produced by merging one [`Chunk`] in isolation.
///
/// `tokens` covers ``chunk.read_range()``: the lookback bytes, then the
/// owned bytes. ``tokens[..settled]`` start inside the lookback and are
/// provisional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    /// The merged chunk.
    pub chunk: Chunk,

    /// The merged symbols over the chunk's read range.
    pub tokens: Vec<SymbolId>,

    /// The index of the first token starting at or after ``chunk.start``.
    pub settled: usize,
}

impl ChunkResult {
    /// Merge `bytes`, the read range of `chunk`.
    pub fn merge(
        engine: &mut MergeEngine,
        table: &MergeTable,
        chunk: Chunk,
        bytes: &[u8],
    ) -> Self {
        let mut tokens = Vec::with_capacity(bytes.len() / 2 + 1);
        engine.merge_bytes_into(table, bytes, &mut tokens);

        let mut settled = 0;
        let mut offset = 0;
        while settled < tokens.len() && offset < chunk.lookback {
            offset += table.symbol_len(tokens[settled]);
            settled += 1;
        }

        Self {
            chunk,
            tokens,
            settled,
        }
    }

    /// The provisional tokens, which start inside the lookback.
    pub fn provisional(&self) -> &[SymbolId] {
        &self.tokens[..self.settled]
    }
}

/// Where the stream and a new chunk result are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    /// A byte offset both sides have a token boundary at.
    Shared { stream_keep: usize, result_skip: usize },

    /// No shared boundary; `straddle` is the result token covering the chunk start.
    Straddle { straddle: usize, straddle_start: usize },
}

/// Appends chunk results, in chunk order, into the exact token stream.
///
/// ``sink ++ tail`` is always the merge of the bytes covered so far.
#[derive(Debug)]
pub struct StreamAssembler<'a, S: TokenSink> {
    table: &'a MergeTable,
    reconciler: BoundaryReconciler,
    engine: MergeEngine,
    window: usize,
    retain: usize,
    sink: S,
    tail: Vec<SymbolId>,
    end: usize,
    chunks: usize,
    repaired: usize,
}

impl<'a, S: TokenSink> StreamAssembler<'a, S> {
    /// Create an assembler appending into `sink`.
    ///
    /// `sink` should be empty; its contents become the stream's prefix.
    pub fn new(
        table: &'a MergeTable,
        window: NonZeroUsize,
        sink: S,
    ) -> Self {
        Self {
            table,
            reconciler: BoundaryReconciler::new(window),
            engine: MergeEngine::new(),
            window: window.get(),
            retain: 0,
            sink,
            tail: Vec::new(),
            end: 0,
            chunks: 0,
            repaired: 0,
        }
    }

    /// Keep at least `bytes` of the stream in the tail between chunks.
    ///
    /// A chunk lookback longer than the tail is served by reading back
    /// from the sink.
    pub fn with_retention(
        self,
        bytes: usize,
    ) -> Self {
        Self {
            retain: bytes,
            ..self
        }
    }

    /// The bytes covered so far.
    pub fn end(&self) -> usize {
        self.end
    }

    /// The chunks appended so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// The boundaries which needed a window re-merge.
    pub fn repaired(&self) -> usize {
        self.repaired
    }

    /// The tokens not yet handed to the sink.
    pub fn tail(&self) -> &[SymbolId] {
        &self.tail
    }

    /// The heap bytes held by the tail.
    pub fn tail_bytes(&self) -> usize {
        self.tail.capacity() * size_of::<SymbolId>()
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Hand the tail to the sink, and return it.
    ///
    /// ## Errors
    /// Any error from [`TokenSink::push_tokens`].
    pub fn finish(mut self) -> BCResult<S> {
        self.sink.push_tokens(&self.tail)?;
        Ok(self.sink)
    }

    /// Append the next chunk's result.
    ///
    /// ## Errors
    /// [`BytechipperError::InvalidTokenStream`] if `result` does not start
    /// where the stream ends; any error from the sink.
    pub fn push(
        &mut self,
        result: &ChunkResult,
    ) -> BCResult<()> {
        let chunk = result.chunk;
        if chunk.start != self.end || chunk.lookback > chunk.start {
            return Err(BytechipperError::InvalidTokenStream(format!(
                "chunk {} covers {:?}, but the stream ends at {}",
                chunk.index,
                chunk.read_range(),
                self.end
            )));
        }

        self.refill(chunk.lookback)?;

        let repaired = match self.find_join(result) {
            Join::Shared {
                stream_keep,
                result_skip,
            } => {
                log::debug!(
                    "chunk {}: joining at token {stream_keep} ({} provisional)",
                    chunk.index,
                    result.settled
                );
                self.tail.truncate(stream_keep);
                self.append(&result.tokens[result_skip..])?
            }
            Join::Straddle {
                straddle,
                straddle_start,
            } => {
                log::debug!(
                    "chunk {}: no shared boundary in lookback; re-merging the straddling token",
                    chunk.index
                );
                let bytes = self.table.try_expand(&result.tokens[straddle..=straddle])?;
                let mut gap = Vec::new();
                self.engine.merge_bytes_into(
                    self.table,
                    &bytes[chunk.start - straddle_start..],
                    &mut gap,
                );
                let a = self.append(&gap)?;
                let b = self.append(&result.tokens[straddle + 1..])?;
                a || b
            }
        };

        if repaired {
            self.repaired += 1;
        }
        self.end = chunk.end;
        self.chunks += 1;
        self.settle()
    }

    /// Append `right` to the tail, repairing the cut.
    fn append(
        &mut self,
        right: &[SymbolId],
    ) -> BCResult<bool> {
        loop {
            let before = self.sink.last();
            match self
                .reconciler
                .repair(self.table, &self.tail, right, before)?
            {
                CutRepair::Safe => {
                    self.tail.extend_from_slice(right);
                    return Ok(false);
                }
                CutRepair::Splice(splice) => {
                    splice_into(&mut self.tail, splice, right);
                    return Ok(true);
                }
                CutRepair::NeedsLeft => {
                    let count = self.tail.len().max(self.window);
                    self.unsettle(count)?;
                }
            }
        }
    }

    /// Move up to `count` tokens back from the sink onto the tail.
    fn unsettle(
        &mut self,
        count: usize,
    ) -> BCResult<usize> {
        let mut head = self.sink.pop_tokens(count)?;
        let taken = head.len();
        if taken > 0 {
            log::debug!("taking {taken} tokens back from the sink");
            head.extend_from_slice(&self.tail);
            self.tail = head;
        }
        Ok(taken)
    }

    /// Grow the tail until it covers `bytes`, or holds the whole stream.
    fn refill(
        &mut self,
        bytes: usize,
    ) -> BCResult<()> {
        let mut held = self.covered(&self.tail);
        while held < bytes {
            let count = self.tail.len().max(self.window);
            let taken = self.unsettle(count)?;
            if taken == 0 {
                break;
            }
            held = held.saturating_add(self.covered(&self.tail[..taken]));
        }
        Ok(())
    }

    /// Hand all but the retained suffix of the tail to the sink.
    fn settle(&mut self) -> BCResult<()> {
        let mut held = 0usize;
        let mut keep = 0;
        for &token in self.tail.iter().rev() {
            if held >= self.retain && keep >= self.window {
                break;
            }
            held = held.saturating_add(self.table.symbol_len(token));
            keep += 1;
        }

        let settled = self.tail.len() - keep;
        if settled > 0 {
            self.sink.push_tokens(&self.tail[..settled])?;
            self.tail.drain(..settled);
        }
        Ok(())
    }

    fn covered(
        &self,
        tokens: &[SymbolId],
    ) -> usize {
        tokens
            .iter()
            .map(|&t| self.table.symbol_len(t))
            .fold(0, usize::saturating_add)
    }

    fn find_join(
        &self,
        result: &ChunkResult,
    ) -> Join {
        let chunk = result.chunk;
        let window_start = chunk.start - chunk.lookback;

        // Tail boundaries in [window_start, start], ascending.
        let mut stream_bounds = vec![(self.end, self.tail.len())];
        let mut offset = self.end;
        for idx in (0..self.tail.len()).rev() {
            if offset <= window_start {
                break;
            }
            offset = offset.saturating_sub(self.table.symbol_len(self.tail[idx]));
            if offset >= window_start {
                stream_bounds.push((offset, idx));
            }
        }
        stream_bounds.reverse();

        // Result boundaries in [window_start, start], ascending.
        let mut result_bounds = Vec::with_capacity(result.settled + 1);
        let mut offset = window_start;
        let mut straddle = None;
        for (idx, &token) in result.tokens.iter().enumerate() {
            if offset > chunk.start {
                break;
            }
            result_bounds.push((offset, idx));
            let next = offset + self.table.symbol_len(token);
            if offset < chunk.start && next > chunk.start {
                straddle = Some((idx, offset));
            }
            offset = next;
        }

        let mut shared = None;
        let (mut i, mut j) = (0, 0);
        while i < stream_bounds.len() && j < result_bounds.len() {
            let (so, si) = stream_bounds[i];
            let (ro, ri) = result_bounds[j];
            if so == ro {
                let join = Join::Shared {
                    stream_keep: si,
                    result_skip: ri,
                };
                if so > window_start || chunk.lookback == 0 {
                    return join;
                }
                shared.get_or_insert(join);
                i += 1;
                j += 1;
            } else if so < ro {
                i += 1;
            } else {
                j += 1;
            }
        }
        if let Some(join) = shared {
            return join;
        }

        match straddle {
            Some((straddle, straddle_start)) => Join::Straddle {
                straddle,
                straddle_start,
            },
            // Every result boundary up to the chunk start was visited, and
            // the stream always has one at the chunk start.
            None => Join::Shared {
                stream_keep: self.tail.len(),
                result_skip: result.settled,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        chunking::plan,
        engine::merge_bytes,
        testing::{arb_input, arb_table},
    };

    fn assemble_retaining(
        table: &MergeTable,
        input: &[u8],
        chunk_size: usize,
        lookback: usize,
        window: usize,
        retain: usize,
    ) -> Vec<SymbolId> {
        let mut engine = MergeEngine::new();
        let mut assembler =
            StreamAssembler::new(table, NonZeroUsize::new(window).unwrap(), Vec::<SymbolId>::new())
                .with_retention(retain);
        for chunk in plan(input.len(), chunk_size, lookback) {
            let result = ChunkResult::merge(&mut engine, table, chunk, &input[chunk.read_range()]);
            assembler.push(&result).unwrap();
        }
        assert_eq!(assembler.end(), input.len());
        assembler.finish().unwrap()
    }

    fn assemble(
        table: &MergeTable,
        input: &[u8],
        chunk_size: usize,
        lookback: usize,
        window: usize,
    ) -> Vec<SymbolId> {
        assemble_retaining(table, input, chunk_size, lookback, window, lookback)
    }

    #[test]
    fn test_settled_index() {
        let table = MergeTable::build([(97, 98)]).unwrap();
        let chunk = Chunk {
            index: 1,
            start: 4,
            end: 6,
            lookback: 3,
        };
        // read range bytes: "cab" + "ab" -> [c, ab, ab, ...]
        let result = ChunkResult::merge(&mut MergeEngine::new(), &table, chunk, b"cabab");
        assert_eq!(result.tokens, vec![99, 256, 256]);
        assert_eq!(result.settled, 2);
        assert_eq!(result.provisional(), &[99, 256]);
    }

    #[test]
    fn test_straddling_lookback() {
        // "ab" straddles every chunk start at odd offsets.
        let table = MergeTable::build([(97, 98)]).unwrap();
        let input = b"abababab";
        assert_eq!(assemble(&table, input, 3, 1, 2), merge_bytes(&table, input));
        assert_eq!(assemble(&table, input, 3, 2, 2), merge_bytes(&table, input));
    }

    #[test]
    fn test_parity_across_chunks() {
        let table = MergeTable::build([(97, 97)]).unwrap();
        let input = vec![b'a'; 77];
        for chunk_size in [1, 2, 3, 5, 8, 13] {
            for lookback in [0, 1, 4] {
                assert_eq!(
                    assemble(&table, &input, chunk_size, lookback, 1),
                    merge_bytes(&table, &input),
                    "chunk_size={chunk_size} lookback={lookback}"
                );
            }
        }
    }

    #[test]
    fn test_tail_stays_short() {
        let table = MergeTable::build([(97, 98), (256, 256), (99, 99)]).unwrap();
        let input = b"ababcccabababab".repeat(200);
        let mut engine = MergeEngine::new();
        let mut assembler =
            StreamAssembler::new(&table, NonZeroUsize::new(2).unwrap(), Vec::<SymbolId>::new())
                .with_retention(6);

        let mut longest = 0;
        for chunk in plan(input.len(), 16, 6) {
            let result =
                ChunkResult::merge(&mut engine, &table, chunk, &input[chunk.read_range()]);
            assembler.push(&result).unwrap();
            longest = longest.max(assembler.tail().len());
        }
        // The retained bytes, plus at most one symbol's overhang.
        assert!(longest <= 8, "tail grew to {longest} tokens");
        assert_eq!(assembler.finish().unwrap(), merge_bytes(&table, &input));
    }

    #[test]
    fn test_repairs_reach_into_the_sink() {
        // A trailing "b" re-pairs every symbol of "edcab" in turn.
        let table =
            MergeTable::build([(98, 98), (97, 98), (99, 97), (100, 99), (101, 100)]).unwrap();
        let input = b"edcabb";
        assert_eq!(merge_bytes(&table, input), vec![260, 258, 256]);

        let mut engine = MergeEngine::new();
        let mut assembler =
            StreamAssembler::new(&table, NonZeroUsize::new(1).unwrap(), Vec::<SymbolId>::new());
        for chunk in plan(input.len(), 5, 0) {
            let result = ChunkResult::merge(&mut engine, &table, chunk, &input[chunk.read_range()]);
            assembler.push(&result).unwrap();
            if chunk.index == 0 {
                assert_eq!(assembler.sink(), &vec![101, 259]);
                assert_eq!(assembler.tail(), &[257]);
            }
        }
        assert_eq!(assembler.repaired(), 1);
        assert_eq!(assembler.finish().unwrap(), vec![260, 258, 256]);

        let input = b"edcabbedcab".repeat(30);
        for chunk_size in [1, 2, 5, 7] {
            assert_eq!(
                assemble_retaining(&table, &input, chunk_size, 0, 1, 0),
                merge_bytes(&table, &input),
                "chunk_size={chunk_size}"
            );
        }
    }

    #[test]
    fn test_rejects_out_of_order() {
        let table = MergeTable::build([(97, 98)]).unwrap();
        let mut assembler =
            StreamAssembler::new(&table, NonZeroUsize::new(4).unwrap(), Vec::<SymbolId>::new());
        let chunk = Chunk {
            index: 1,
            start: 4,
            end: 8,
            lookback: 0,
        };
        let result = ChunkResult::merge(&mut MergeEngine::new(), &table, chunk, b"abab");
        assert!(matches!(
            assembler.push(&result),
            Err(BytechipperError::InvalidTokenStream(_))
        ));
    }

    proptest! {
        #[test]
        fn test_assembly_matches_unchunked(
            table in arb_table(20),
            input in arb_input(160),
            chunk_size in 1..40usize,
            lookback in 0..12usize,
            window in 1..6usize,
            retain in 0..16usize,
        ) {
            prop_assert_eq!(
                assemble_retaining(&table, &input, chunk_size, lookback, window, retain),
                merge_bytes(&table, &input)
            );
        }
    }
}
