//! # Chunking
//!
//! Splits an input into contiguous chunks, each borrowing a lookback
//! prefix from its predecessor.
//!
//! ```rust
//! use bytechipper::chunking::plan;
//!
//! let chunks = plan(10, 4, 2);
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[1].read_range(), 2..8);
//! ```

mod planner;
mod sizing;

#[doc(inline)]
pub use planner::*;
#[doc(inline)]
pub use sizing::*;
