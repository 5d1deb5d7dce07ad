//! # Parallel Execution
//!
//! Chunked, memory-budgeted, cancellable tokenization over a worker pool.

mod assembler;
mod cancel;
mod memory_budget;
mod parallel_executor;

#[doc(inline)]
pub use assembler::*;
#[doc(inline)]
pub use cancel::*;
#[doc(inline)]
pub use memory_budget::*;
#[doc(inline)]
pub use parallel_executor::*;
