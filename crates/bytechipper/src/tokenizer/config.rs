//! # Tokenizer Configuration
//!
//! [`TokenizerOptions`] holds unvalidated caller input; [`TokenizerOptions::validate`]
//! produces the immutable [`TokenizerConfig`] a tokenizer runs with.

use core::{fmt, num::NonZeroUsize, str::FromStr};

use crate::{
    chunking::ChunkSize,
    concurrency::threads::resolve_thread_count,
    errors::{BCResult, BytechipperError},
    reconcile::DEFAULT_RECONCILE_WINDOW,
    table::{MergeRule, MergeTable},
    types::{BYTE_SYMBOL_COUNT, ContentType, Pair, SymbolId},
};

/// A memory cap, as a percentage of total memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryCap(u8);

impl MemoryCap {
    /// The default cap.
    pub const DEFAULT: MemoryCap = MemoryCap(80);

    /// Validate a percentage.
    ///
    /// ## Errors
    /// [`BytechipperError::InvalidConfig`] outside ``0..=100``.
    pub fn new(percent: u32) -> BCResult<Self> {
        match u8::try_from(percent) {
            Ok(p @ 0..=100) => Ok(MemoryCap(p)),
            _ => Err(BytechipperError::InvalidConfig(format!(
                "memory cap must be a percentage in 0..=100, got {percent}"
            ))),
        }
    }

    /// The percentage.
    pub fn percent(&self) -> u8 {
        self.0
    }

    /// This cap's share of `total` bytes.
    pub fn apply(
        &self,
        total: u64,
    ) -> u64 {
        ((total as u128 * self.0 as u128) / 100) as u64
    }
}

impl Default for MemoryCap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for MemoryCap {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An unvalidated chunk size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChunkSizeArg {
    /// Pick automatically.
    #[default]
    Auto,

    /// A byte count.
    Bytes(usize),

    /// A byte-size string; see [`crate::chunking::parse_byte_size`].
    Text(String),
}

impl ChunkSizeArg {
    /// Validate.
    pub fn resolve(&self) -> BCResult<ChunkSize> {
        match self {
            ChunkSizeArg::Auto => Ok(ChunkSize::Auto),
            ChunkSizeArg::Bytes(n) => ChunkSize::fixed(*n),
            ChunkSizeArg::Text(s) => ChunkSize::from_str(s),
        }
    }
}

impl From<usize> for ChunkSizeArg {
    fn from(bytes: usize) -> Self {
        ChunkSizeArg::Bytes(bytes)
    }
}

impl From<&str> for ChunkSizeArg {
    fn from(s: &str) -> Self {
        ChunkSizeArg::Text(s.to_string())
    }
}

impl From<String> for ChunkSizeArg {
    fn from(s: String) -> Self {
        ChunkSizeArg::Text(s)
    }
}

/// Options for building a [`crate::ByteTokenizer`].
///
/// Fields are unvalidated; see [`TokenizerOptions::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// The merge rules, in rank order.
    pub merges: Vec<MergeRule>,

    /// The content-type name; ``"Text"`` or ``"Bin"``.
    pub content_type: Option<String>,

    /// The worker count; defaults to the available parallelism.
    pub thread_count: Option<usize>,

    /// The chunk size policy.
    pub chunk_size: ChunkSizeArg,

    /// The memory cap percentage; defaults to [`MemoryCap::DEFAULT`].
    pub memory_cap: Option<u32>,

    /// The total memory, in bytes, the cap applies to; detected when unset.
    pub memory_ceiling: Option<u64>,

    /// The reconciler's initial window, in tokens per side.
    pub reconcile_window: Option<usize>,
}

impl TokenizerOptions {
    /// Sets the merge rules from ordered pairs; merged id = ``256 + rank``.
    pub fn set_merges<I>(
        &mut self,
        pairs: I,
    ) where
        I: IntoIterator<Item = Pair>,
    {
        self.merges = pairs
            .into_iter()
            .enumerate()
            .map(|(rank, (left, right))| {
                MergeRule::new(left, right, (BYTE_SYMBOL_COUNT + rank) as SymbolId)
            })
            .collect();
    }

    /// Sets the merge rules from ordered pairs.
    pub fn with_merges<I>(
        mut self,
        pairs: I,
    ) -> Self
    where
        I: IntoIterator<Item = Pair>,
    {
        self.set_merges(pairs);
        self
    }

    /// Sets the merge rules.
    pub fn with_rules(
        mut self,
        rules: Vec<MergeRule>,
    ) -> Self {
        self.merges = rules;
        self
    }

    /// Sets the content type by name.
    pub fn with_content_type(
        mut self,
        content_type: impl Into<String>,
    ) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the worker count.
    pub fn with_thread_count(
        mut self,
        thread_count: usize,
    ) -> Self {
        self.thread_count = Some(thread_count);
        self
    }

    /// Sets the chunk size.
    pub fn with_chunk_size(
        mut self,
        chunk_size: impl Into<ChunkSizeArg>,
    ) -> Self {
        self.chunk_size = chunk_size.into();
        self
    }

    /// Sets the memory cap percentage.
    pub fn with_memory_cap(
        mut self,
        memory_cap: u32,
    ) -> Self {
        self.memory_cap = Some(memory_cap);
        self
    }

    /// Sets the total memory the cap applies to.
    pub fn with_memory_ceiling(
        mut self,
        bytes: u64,
    ) -> Self {
        self.memory_ceiling = Some(bytes);
        self
    }

    /// Sets the reconciler's initial window.
    pub fn with_reconcile_window(
        mut self,
        window: usize,
    ) -> Self {
        self.reconcile_window = Some(window);
        self
    }

    /// Validate and build the merge table.
    pub fn build_table(&self) -> BCResult<MergeTable> {
        MergeTable::build_rules(self.merges.iter().copied())
    }

    /// Validate everything but the merges.
    ///
    /// ## Errors
    /// [`BytechipperError::InvalidConfig`] for an unknown content type, a
    /// memory cap outside ``0..=100``, or a zero thread count, chunk size,
    /// memory ceiling or reconcile window.
    pub fn validate(&self) -> BCResult<TokenizerConfig> {
        let content_type = self
            .content_type
            .as_deref()
            .map(|name| {
                ContentType::from_str(name.trim()).map_err(|_| {
                    BytechipperError::InvalidConfig(format!(
                        "content type must be \"Text\" or \"Bin\", got {name:?}"
                    ))
                })
            })
            .transpose()?;

        let memory_cap = match self.memory_cap {
            Some(percent) => MemoryCap::new(percent)?,
            None => MemoryCap::DEFAULT,
        };

        let memory_ceiling = match self.memory_ceiling {
            Some(0) => {
                return Err(BytechipperError::InvalidConfig(
                    "memory ceiling must be positive".to_string(),
                ));
            }
            ceiling => ceiling,
        };

        let reconcile_window =
            NonZeroUsize::new(self.reconcile_window.unwrap_or(DEFAULT_RECONCILE_WINDOW))
                .ok_or_else(|| {
                    BytechipperError::InvalidConfig("reconcile window must be positive".to_string())
                })?;

        Ok(TokenizerConfig {
            content_type,
            thread_count: resolve_thread_count(self.thread_count)?,
            chunk_size: self.chunk_size.resolve()?,
            memory_cap,
            memory_ceiling,
            reconcile_window,
        })
    }
}

/// Validated, immutable tokenizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// The content type marker to write, if any.
    pub content_type: Option<ContentType>,

    /// The worker count.
    pub thread_count: NonZeroUsize,

    /// The chunk size policy.
    pub chunk_size: ChunkSize,

    /// The memory cap.
    pub memory_cap: MemoryCap,

    /// The total memory the cap applies to; detected when unset.
    pub memory_ceiling: Option<u64>,

    /// The reconciler's initial window.
    pub reconcile_window: NonZeroUsize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            content_type: None,
            thread_count: crate::concurrency::threads::est_max_parallelism(),
            chunk_size: ChunkSize::Auto,
            memory_cap: MemoryCap::DEFAULT,
            memory_ceiling: None,
            reconcile_window: NonZeroUsize::new(DEFAULT_RECONCILE_WINDOW)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_err(options: TokenizerOptions) -> String {
        match options.validate() {
            Err(BytechipperError::InvalidConfig(msg)) => msg,
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn test_memory_cap() {
        assert_eq!(MemoryCap::new(0).unwrap().percent(), 0);
        assert_eq!(MemoryCap::new(100).unwrap().percent(), 100);
        assert!(MemoryCap::new(101).is_err());
        assert!(MemoryCap::new(150).is_err());
        assert!(MemoryCap::new(300).is_err());

        assert_eq!(MemoryCap::DEFAULT.apply(1000), 800);
        assert_eq!(MemoryCap::new(100).unwrap().apply(u64::MAX), u64::MAX);
        assert_eq!(MemoryCap::default().to_string(), "80");
    }

    #[test]
    fn test_defaults() {
        let config = TokenizerOptions::default().validate().unwrap();
        assert_eq!(config.content_type, None);
        assert_eq!(config.chunk_size, ChunkSize::Auto);
        assert_eq!(config.memory_cap, MemoryCap::DEFAULT);
        assert_eq!(config.reconcile_window.get(), DEFAULT_RECONCILE_WINDOW);
    }

    #[test]
    fn test_full_options() {
        let options = TokenizerOptions::default()
            .with_merges([(97, 98), (256, 99)])
            .with_content_type("text")
            .with_thread_count(3)
            .with_chunk_size("64KB")
            .with_memory_cap(50)
            .with_memory_ceiling(1 << 30)
            .with_reconcile_window(2);

        assert_eq!(options.merges[1], MergeRule::new(256, 99, 257));
        assert_eq!(options.build_table().unwrap().len(), 2);

        let config = options.validate().unwrap();
        assert_eq!(config.content_type, Some(ContentType::Text));
        assert_eq!(config.thread_count.get(), 3);
        assert_eq!(config.chunk_size, ChunkSize::fixed(64 * 1024).unwrap());
        assert_eq!(config.memory_cap.percent(), 50);
        assert_eq!(config.memory_ceiling, Some(1 << 30));
        assert_eq!(config.reconcile_window.get(), 2);
    }

    #[test]
    fn test_invalid_options() {
        config_err(TokenizerOptions::default().with_memory_cap(150));
        config_err(TokenizerOptions::default().with_content_type("Invalid"));
        config_err(TokenizerOptions::default().with_thread_count(0));
        config_err(TokenizerOptions::default().with_chunk_size("0"));
        config_err(TokenizerOptions::default().with_chunk_size(0));
        config_err(TokenizerOptions::default().with_chunk_size("1.5MB"));
        config_err(TokenizerOptions::default().with_memory_ceiling(0));
        config_err(TokenizerOptions::default().with_reconcile_window(0));
    }

    #[test]
    fn test_invalid_merges_surface_at_build() {
        let options = TokenizerOptions::default().with_merges([(97, 98), (97, 98)]);
        assert!(matches!(
            options.build_table(),
            Err(BytechipperError::MergeTable(_))
        ));
    }
}
