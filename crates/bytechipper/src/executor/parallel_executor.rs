//! # Parallel Chunk Executor
//!
//! Three roles share one tokenize call:
//! - a dispatcher thread copies each chunk's read range into an owned
//!   buffer, after admitting it against the [`MemoryBudget`];
//! - pool workers merge chunks, in any order;
//! - the calling thread collects results, and appends them to the
//!   [`StreamAssembler`] strictly in chunk order, which settles the
//!   stream into a [`TokenSink`] as it goes.

use core::num::NonZeroUsize;
use std::{
    collections::BTreeMap,
    sync::{Arc, mpsc},
    thread,
};

use crate::{
    chunking::{Chunk, ChunkPlanner},
    engine::MergeEngine,
    errors::{BCResult, BytechipperError},
    executor::{CancelToken, ChunkResult, MemoryBudget, StreamAssembler},
    stream::TokenSink,
    table::MergeTable,
    types::SymbolId,
};

/// Budgeted bytes per input byte: the input copy, plus a worst-case symbol per byte.
pub const BUDGET_BYTES_PER_INPUT_BYTE: u64 = 1 + size_of::<SymbolId>() as u64;

/// The output of one executor run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// The token stream.
    pub tokens: Vec<SymbolId>,

    /// The number of chunks processed.
    pub chunks: usize,

    /// The number of chunk boundaries which needed a window re-merge.
    pub repaired: usize,
}

/// Counters from an executor run into a [`TokenSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// The number of tokens produced.
    pub tokens: usize,

    /// The number of chunks processed.
    pub chunks: usize,

    /// The number of chunk boundaries which needed a window re-merge.
    pub repaired: usize,
}

/// Executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// The maximum owned bytes per chunk.
    pub chunk_size: NonZeroUsize,

    /// The lookback bytes per chunk.
    pub lookback: usize,

    /// The in-flight memory limit, in bytes.
    pub memory_limit: u64,

    /// The reconciler's initial window.
    pub reconcile_window: NonZeroUsize,
}

/// A message from a worker to the collector.
type WorkerMessage = BCResult<(ChunkResult, u64)>;

/// Schedules chunk merges on a bounded worker pool.
#[derive(Debug)]
pub struct ParallelExecutor {
    table: Arc<MergeTable>,
    pool: rayon::ThreadPool,
    threads: NonZeroUsize,
    config: ExecutorConfig,
}

impl ParallelExecutor {
    /// Build an executor with a dedicated pool of `threads` workers.
    pub fn new(
        table: Arc<MergeTable>,
        threads: NonZeroUsize,
        config: ExecutorConfig,
    ) -> BCResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.get())
            .thread_name(|i| format!("bytechipper-worker-{i}"))
            .build()?;
        Ok(Self {
            table,
            pool,
            threads,
            config,
        })
    }

    /// The shared merge table.
    pub fn table(&self) -> &Arc<MergeTable> {
        &self.table
    }

    /// The worker count.
    pub fn threads(&self) -> NonZeroUsize {
        self.threads
    }

    /// The executor settings.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// The chunk planner for this executor.
    pub fn planner(&self) -> ChunkPlanner {
        ChunkPlanner::new(
            self.config.chunk_size.get(),
            self.config.lookback.min(self.config.chunk_size.get()),
        )
    }

    /// Tokenize `input` into memory.
    ///
    /// The result equals a single merge pass over all of `input`,
    /// for every thread count and chunk size.
    ///
    /// ## Errors
    /// [`BytechipperError::Cancelled`] if `cancel` fires before the stream is complete.
    pub fn run(
        &self,
        input: &[u8],
        cancel: &CancelToken,
    ) -> BCResult<ExecutionOutput> {
        let mut tokens = Vec::new();
        let stats = self.run_into(input, &mut tokens, cancel)?;
        Ok(ExecutionOutput {
            tokens,
            chunks: stats.chunks,
            repaired: stats.repaired,
        })
    }

    /// Tokenize `input`, appending the stream to `sink`.
    ///
    /// Tokens reach `sink` as soon as they are final; only a short tail
    /// is held in memory, and it is counted against the memory budget.
    /// On error, `sink` holds an unspecified prefix of the stream.
    ///
    /// ## Errors
    /// [`BytechipperError::Cancelled`] if `cancel` fires before the stream is complete;
    /// any error from `sink`.
    pub fn run_into<S: TokenSink>(
        &self,
        input: &[u8],
        sink: &mut S,
        cancel: &CancelToken,
    ) -> BCResult<ExecutionStats> {
        let chunks = self.planner().plan(input.len());
        log::debug!(
            "planned {} chunks over {} bytes (chunk size {}, lookback {})",
            chunks.len(),
            input.len(),
            self.config.chunk_size,
            self.config.lookback,
        );

        let budget = Arc::new(MemoryBudget::new(self.config.memory_limit));
        let abort = CancelToken::new();
        let (tx, rx) = mpsc::channel::<WorkerMessage>();

        thread::scope(|scope| {
            let dispatcher = {
                let budget = budget.clone();
                let abort = abort.clone();
                let chunks = &chunks;
                thread::Builder::new()
                    .name("bytechipper-dispatch".to_string())
                    .spawn_scoped(scope, move || {
                        self.dispatch(input, chunks, &budget, &abort, cancel, tx)
                    })?
            };

            let collected = self.collect(&rx, chunks.len(), &budget, sink, cancel);
            if collected.is_err() {
                abort.cancel();
                budget.close();
            }
            drop(rx);

            let dispatched = dispatcher
                .join()
                .unwrap_or_else(|_| Err(BytechipperError::Cancelled));

            // A collector failure outranks the dispatcher's resulting cancel.
            let output = collected?;
            dispatched?;
            Ok(output)
        })
    }

    fn dispatch(
        &self,
        input: &[u8],
        chunks: &[Chunk],
        budget: &Arc<MemoryBudget>,
        abort: &CancelToken,
        cancel: &CancelToken,
        tx: mpsc::Sender<WorkerMessage>,
    ) -> BCResult<()> {
        let stopped = || abort.is_cancelled() || cancel.is_cancelled();

        for &chunk in chunks {
            let cost = chunk.read_len() as u64 * BUDGET_BYTES_PER_INPUT_BYTE;
            budget.acquire(cost, &stopped)?;

            let bytes = input[chunk.read_range()].to_vec();

            let table = self.table.clone();
            let budget = budget.clone();
            let abort = abort.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            self.pool.spawn(move || {
                let message = if abort.is_cancelled() || cancel.is_cancelled() {
                    budget.release(cost);
                    Err(BytechipperError::Cancelled)
                } else {
                    let result =
                        ChunkResult::merge(&mut MergeEngine::new(), &table, chunk, &bytes);
                    drop(bytes);

                    // Hold only the produced symbols until reconciled.
                    let held = (result.tokens.len() * size_of::<SymbolId>()) as u64;
                    budget.release(cost.saturating_sub(held));
                    Ok((result, held))
                };
                let _ = tx.send(message);
            });
        }
        Ok(())
    }

    fn collect<S: TokenSink>(
        &self,
        rx: &mpsc::Receiver<WorkerMessage>,
        expected: usize,
        budget: &MemoryBudget,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> BCResult<ExecutionStats> {
        let retain = self.config.lookback.min(self.config.chunk_size.get());
        let mut assembler = StreamAssembler::new(&self.table, self.config.reconcile_window, sink)
            .with_retention(retain);
        let mut pending: BTreeMap<usize, (ChunkResult, u64)> = BTreeMap::new();

        while assembler.chunks() < expected {
            if cancel.is_cancelled() {
                return Err(BytechipperError::Cancelled);
            }
            let Ok(message) = rx.recv() else {
                // Every sender is gone; the dispatcher stopped early.
                return Err(BytechipperError::Cancelled);
            };
            let (result, held) = message?;
            pending.insert(result.chunk.index, (result, held));

            while let Some((result, held)) = pending.remove(&assembler.chunks()) {
                if cancel.is_cancelled() {
                    return Err(BytechipperError::Cancelled);
                }
                assembler.push(&result)?;
                drop(result);
                budget.set_reserved(assembler.tail_bytes() as u64);
                budget.release(held);
            }
        }

        let chunks = assembler.chunks();
        let repaired = assembler.repaired();
        let sink = assembler.finish()?;
        Ok(ExecutionStats {
            tokens: sink.len(),
            chunks,
            repaired,
        })
    }
}
