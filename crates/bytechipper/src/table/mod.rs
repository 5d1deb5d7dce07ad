//! # Merge Tables
//!
//! A [`MergeTable`] is the immutable, ranked ``(left, right) -> merged`` map
//! driving every merge pass.
//!
//! ```rust
//! use bytechipper::table::MergeTable;
//!
//! let table = MergeTable::build([(97, 98), (256, 99)]).unwrap();
//! assert_eq!(table.lookup(97, 98), Some((256, 0)));
//! assert_eq!(table.try_expand(&[257]).unwrap(), b"abc");
//! ```

pub mod io;
mod merge_table;

#[doc(inline)]
pub use io::{MergeIdScheme, load_merge_rules_path, read_merge_rules};
#[doc(inline)]
pub use merge_table::*;
