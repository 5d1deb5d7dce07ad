//! # `bytechipper` Byte-Level BPE Tokenizer Engine
//!
//! `bytechipper` turns the raw bytes of a file into a stream of symbol ids,
//! by applying a ranked table of pair merges (byte-level BPE), and writes
//! the stream as a fixed-width binary file.
//!
//! Large inputs are split into chunks, merged on a bounded worker pool
//! under a memory budget, and stitched back together; the result is
//! identical to a single sequential merge pass over the whole input.
//!
//! See:
//! * [`table`] for merge tables and merges files.
//! * [`engine`] for the merge pass itself.
//! * [`chunking`] and [`reconcile`] for chunk planning and boundary stitching.
//! * [`executor`] for the parallel pipeline.
//! * [`stream`] for the serialized token stream format.
//! * [`ByteTokenizer`] for the file-level entry point.
//!
//! ## Crate Features
//!
//! #### feature: ``ahash``
//!
//! This swaps all HashMap/HashSet implementations for ``ahash``; which is a performance
//! win on many/(most?) modern CPUs.
//!
//! This is done by the ``types::BCHash{*}`` type alias machinery.
//!
//! ## Tokenizing A File
//!
//! ```rust,no_run
//! use bytechipper::{ByteTokenizer, TokenizerOptions, load_bpe_merges};
//!
//! let merges = load_bpe_merges("merges.txt")?;
//! let tokenizer = ByteTokenizer::new(
//!     &TokenizerOptions::default()
//!         .with_rules(merges)
//!         .with_content_type("Text")
//!         .with_chunk_size("4MB")
//!         .with_memory_cap(60),
//! )?;
//! println!("{tokenizer}");
//!
//! let summary = tokenizer.tokenize_file("corpus.txt", "corpus.tokens")?;
//! println!("{summary}");
//! # Ok::<(), bytechipper::BytechipperError>(())
//! ```
#![warn(missing_docs, unused)]

pub mod chunking;
pub mod concurrency;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod reconcile;
pub mod stream;
pub mod table;
pub mod tokenizer;
pub mod types;
pub mod utility;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

#[doc(inline)]
pub use errors::{BCResult, BytechipperError, MergeTableError};
#[doc(inline)]
pub use executor::CancelToken;
#[doc(inline)]
pub use table::{MergeRule, MergeTable};
#[doc(inline)]
pub use tokenizer::{ByteTokenizer, TokenizeSummary, TokenizerConfig, TokenizerOptions};
#[doc(inline)]
pub use types::{ContentType, SymbolId};

/// The crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate version.
pub fn version() -> &'static str {
    VERSION
}

/// Load the ordered merge rules of a two-column merges file.
///
/// Rank is line order, and merged id = ``256 + rank``.
///
/// ## Errors
/// * [`BytechipperError::Io`] if the file cannot be opened or read.
/// * [`BytechipperError::Parse`] on a malformed line.
/// * [`BytechipperError::MergeTable`] if the rules are invalid.
pub fn load_bpe_merges<P: AsRef<Path>>(path: P) -> BCResult<Vec<MergeRule>> {
    let table = MergeTable::load_from_text(path, table::MergeIdScheme::Sequential)?;
    Ok(table.rules().to_vec())
}
