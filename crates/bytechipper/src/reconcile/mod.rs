//! # Boundary Reconciliation
//!
//! ```rust
//! use bytechipper::{engine::merge_bytes, reconcile::reconcile, table::MergeTable};
//!
//! let table = MergeTable::build([(97, 97)]).unwrap();
//! let left = merge_bytes(&table, b"aaa");
//! let right = merge_bytes(&table, b"a");
//! assert_eq!(reconcile(&table, &left, &right).unwrap(), merge_bytes(&table, b"aaaa"));
//! ```

mod boundary;

#[doc(inline)]
pub use boundary::*;
