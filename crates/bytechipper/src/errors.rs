//! # Error Types

use crate::types::{Rank, SymbolId};

/// Errors from merge table construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeTableError {
    /// The same pair appears in two rules.
    #[error("duplicate rule for pair ({left}, {right}) at rank {rank}; first defined at rank {first_rank}")]
    DuplicatePair {
        /// The left symbol of the pair.
        left: SymbolId,
        /// The right symbol of the pair.
        right: SymbolId,
        /// The rank of the first definition.
        first_rank: Rank,
        /// The rank of the duplicate.
        rank: Rank,
    },

    /// Two rules produce the same merged id.
    #[error("merged id {merged} at rank {rank} is already produced at rank {first_rank}")]
    DuplicateMergedId {
        /// The repeated merged id.
        merged: SymbolId,
        /// The rank of the first rule producing it.
        first_rank: Rank,
        /// The rank of the duplicate.
        rank: Rank,
    },

    /// A merged id collides with a byte symbol or the reserved marker range.
    #[error("merged id {merged} at rank {rank} is outside the mergeable id range")]
    ReservedMergedId {
        /// The offending merged id.
        merged: SymbolId,
        /// The rank of the rule.
        rank: Rank,
    },

    /// A rule references a symbol that no earlier rule produces.
    ///
    /// This forbids merge cycles: a merged symbol may only feed
    /// rules with a strictly higher rank.
    #[error("rule at rank {rank} references symbol {symbol}, which no earlier rule produces")]
    UndefinedSymbol {
        /// The unresolved symbol.
        symbol: SymbolId,
        /// The rank of the rule.
        rank: Rank,
    },
}

/// Errors from bytechipper operations.
#[derive(Debug, thiserror::Error)]
pub enum BytechipperError {
    /// Invalid tokenizer configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed merges source.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// The 1-based line number.
        line: usize,
        /// The description of the problem.
        message: String,
    },

    /// Invalid merge table.
    #[error(transparent)]
    MergeTable(#[from] MergeTableError),

    /// Malformed serialized token stream.
    #[error("invalid token stream: {0}")]
    InvalidTokenStream(String),

    /// The tokenize call was cancelled.
    #[error("tokenization cancelled")]
    Cancelled,

    /// The worker pool could not be built.
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl BytechipperError {
    /// Is this an I/O "not found" error?
    pub fn is_not_found(&self) -> bool {
        matches!(self, BytechipperError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type for bytechipper operations.
pub type BCResult<T> = core::result::Result<T, BytechipperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: BytechipperError = MergeTableError::DuplicatePair {
            left: 97,
            right: 98,
            first_rank: 0,
            rank: 3,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "duplicate rule for pair (97, 98) at rank 3; first defined at rank 0"
        );

        let err = BytechipperError::Parse {
            line: 7,
            message: "expected 2 columns".to_string(),
        };
        assert_eq!(err.to_string(), "parse error at line 7: expected 2 columns");
    }

    #[test]
    fn test_not_found() {
        let err: BytechipperError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.is_not_found());
        assert!(!BytechipperError::Cancelled.is_not_found());
    }
}
