//! # BPE Merge Engine
//!
//! ```rust
//! use bytechipper::{engine::merge_bytes, table::MergeTable};
//!
//! let table = MergeTable::build([(97, 98)]).unwrap();
//! assert_eq!(merge_bytes(&table, b"aab"), vec![97, 256]);
//! ```

mod merge_engine;

#[doc(inline)]
pub use merge_engine::*;
