//! # Byte Tokenizer

use core::fmt;
use std::{fs::File, io::Write, path::Path, sync::Arc, time::Duration};

use crate::{
    chunking::{GIB, detect_total_memory, format_byte_size, lookback_for},
    errors::{BCResult, BytechipperError},
    executor::{CancelToken, ExecutionStats, ExecutorConfig, ParallelExecutor},
    stream::{TokenFileWriter, TokenWidth, write_token_stream},
    table::MergeTable,
    tokenizer::{TokenizerConfig, TokenizerOptions},
    types::SymbolId,
    utility::timers::{throughput, timeit},
};

/// Total memory assumed when the platform reports none.
pub const FALLBACK_TOTAL_MEMORY: u64 = 4 * GIB as u64;

/// Statistics for one tokenize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizeSummary {
    /// The input length, in bytes.
    pub input_bytes: u64,

    /// The number of output symbols, excluding any marker.
    pub tokens: usize,

    /// The number of chunks processed.
    pub chunks: usize,

    /// The chunk boundaries which needed a window re-merge.
    pub repaired: usize,

    /// The output length, in bytes.
    pub output_bytes: u64,

    /// The wall time of the call.
    pub elapsed: Duration,
}

impl fmt::Display for TokenizeSummary {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{} bytes -> {} tokens in {} chunks ({} repaired) in {:.3?} ({:.1} MB/s)",
            self.input_bytes,
            self.tokens,
            self.chunks,
            self.repaired,
            self.elapsed,
            throughput(self.input_bytes, self.elapsed) / 1e6,
        )
    }
}

/// Chunked, parallel byte-level BPE tokenizer.
///
/// Output is identical to a single sequential merge pass over the whole
/// input, for every thread count and chunk size.
///
/// ```rust,no_run
/// use bytechipper::{ByteTokenizer, TokenizerOptions};
///
/// let tokenizer = ByteTokenizer::new(
///     &TokenizerOptions::default()
///         .with_merges([(97, 98)])
///         .with_content_type("Text")
///         .with_thread_count(4),
/// )?;
/// tokenizer.tokenize_file("input.txt", "output.bin")?;
/// # Ok::<(), bytechipper::BytechipperError>(())
/// ```
#[derive(Debug)]
pub struct ByteTokenizer {
    config: TokenizerConfig,
    width: TokenWidth,
    executor: ParallelExecutor,
}

impl ByteTokenizer {
    /// Validate `options` and build a tokenizer.
    ///
    /// ## Errors
    /// * [`BytechipperError::InvalidConfig`] on invalid options.
    /// * [`BytechipperError::MergeTable`] on invalid merges.
    pub fn new(options: &TokenizerOptions) -> BCResult<Self> {
        let config = options.validate()?;
        let table = options.build_table()?;
        Self::from_table(table, config)
    }

    /// Build a tokenizer for a prebuilt table.
    pub fn from_table(
        table: impl Into<Arc<MergeTable>>,
        config: TokenizerConfig,
    ) -> BCResult<Self> {
        let table: Arc<MergeTable> = table.into();

        let total_memory = config
            .memory_ceiling
            .or_else(detect_total_memory)
            .unwrap_or_else(|| {
                log::warn!(
                    "total memory unavailable; assuming {}",
                    format_byte_size(FALLBACK_TOTAL_MEMORY as usize)
                );
                FALLBACK_TOTAL_MEMORY
            });

        let chunk_size = config.chunk_size.resolve(
            total_memory,
            config.memory_cap.percent(),
            config.thread_count,
        );
        let executor_config = ExecutorConfig {
            chunk_size: core::num::NonZeroUsize::new(chunk_size)
                .ok_or_else(|| BytechipperError::InvalidConfig("chunk size is zero".into()))?,
            lookback: lookback_for(&table),
            memory_limit: config.memory_cap.apply(total_memory),
            reconcile_window: config.reconcile_window,
        };
        log::debug!(
            "tokenizer: {} merges, {} threads, chunk size {}, lookback {}, memory limit {}",
            table.len(),
            config.thread_count,
            format_byte_size(chunk_size),
            executor_config.lookback,
            executor_config.memory_limit,
        );

        let width = TokenWidth::for_table(&table);
        let executor = ParallelExecutor::new(table, config.thread_count, executor_config)?;

        Ok(Self {
            config,
            width,
            executor,
        })
    }

    /// The merge table.
    pub fn table(&self) -> &Arc<MergeTable> {
        self.executor.table()
    }

    /// The validated configuration.
    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// The serialized symbol width.
    pub fn width(&self) -> TokenWidth {
        self.width
    }

    /// The resolved chunk size, in bytes.
    pub fn chunk_size(&self) -> usize {
        self.executor.config().chunk_size.get()
    }

    /// The in-flight memory limit, in bytes.
    pub fn memory_limit(&self) -> u64 {
        self.executor.config().memory_limit
    }

    /// Tokenize an in-memory buffer.
    ///
    /// The whole token stream is returned in memory.
    pub fn tokenize_bytes(
        &self,
        input: &[u8],
    ) -> BCResult<Vec<SymbolId>> {
        Ok(self.executor.run(input, &CancelToken::new())?.tokens)
    }

    /// Tokenize a buffer into `writer`.
    ///
    /// The stream is assembled in memory, and written once complete, so
    /// `writer` sees nothing on error. Use [`ByteTokenizer::tokenize_file`]
    /// for inputs whose token stream should not be held in memory.
    pub fn tokenize_to_writer<W: Write>(
        &self,
        input: &[u8],
        writer: W,
        cancel: &CancelToken,
    ) -> BCResult<TokenizeSummary> {
        let (elapsed, result) = timeit(|| -> BCResult<_> {
            let mut tokens = Vec::new();
            let stats = self.executor.run_into(input, &mut tokens, cancel)?;
            let written =
                write_token_stream(writer, &tokens, self.width, self.config.content_type)?;
            Ok((stats, written))
        });
        let (stats, written) = result?;
        Ok(self.summarize(input.len() as u64, &stats, written, elapsed))
    }

    /// Tokenize `input` into the token stream file `output`.
    ///
    /// Tokens stream into a temporary file beside `output` as they become
    /// final, which is renamed over `output` on success. Any existing file
    /// at `output` is replaced. On error, no output file is produced, and
    /// an existing one is left untouched.
    ///
    /// ## Errors
    /// * [`BytechipperError::Io`] if `input` cannot be read or `output` written.
    pub fn tokenize_file<P, Q>(
        &self,
        input: P,
        output: Q,
    ) -> BCResult<TokenizeSummary>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.tokenize_file_with_cancel(input, output, &CancelToken::new())
    }

    /// Tokenize a file, stopping early if `cancel` fires.
    ///
    /// ## Errors
    /// * [`BytechipperError::Cancelled`] if cancelled; no output is produced.
    /// * [`BytechipperError::Io`] if `input` cannot be read or `output` written.
    pub fn tokenize_file_with_cancel<P, Q>(
        &self,
        input: P,
        output: Q,
        cancel: &CancelToken,
    ) -> BCResult<TokenizeSummary>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let (input, output) = (input.as_ref(), output.as_ref());

        let (elapsed, result) = timeit(|| -> BCResult<_> {
            let file = File::open(input)?;
            let input_bytes = file.metadata()?.len();

            let mut writer = TokenFileWriter::create(output, self.width, self.config.content_type)?;
            let stats = if input_bytes == 0 {
                self.executor.run_into(&[], &mut writer, cancel)?
            } else {
                // SAFETY: the map is read-only, and dropped before this call returns.
                let map = unsafe { memmap2::Mmap::map(&file)? };
                self.executor.run_into(&map, &mut writer, cancel)?
            };

            // Dropping the writer removes the temporary file.
            if cancel.is_cancelled() {
                return Err(BytechipperError::Cancelled);
            }
            let written = writer.persist()?;
            Ok((input_bytes, stats, written))
        });
        let (input_bytes, stats, written) = result?;

        let summary = self.summarize(input_bytes, &stats, written, elapsed);
        log::info!("{} -> {}: {summary}", input.display(), output.display());
        Ok(summary)
    }

    fn summarize(
        &self,
        input_bytes: u64,
        stats: &ExecutionStats,
        output_bytes: u64,
        elapsed: Duration,
    ) -> TokenizeSummary {
        TokenizeSummary {
            input_bytes,
            tokens: stats.tokens,
            chunks: stats.chunks,
            repaired: stats.repaired,
            output_bytes,
            elapsed,
        }
    }
}

impl fmt::Display for ByteTokenizer {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "ByteTokenizer(merges={}, content_type={:?}, threads={}, chunk_size={}, memory_cap={})",
            self.table().len(),
            self.config.content_type.map(|ct| ct.name()),
            self.config.thread_count,
            format_byte_size(self.chunk_size()),
            self.config.memory_cap,
        )
    }
}
