//! # Tokenizer

mod byte_tokenizer;
mod config;

#[doc(inline)]
pub use byte_tokenizer::*;
#[doc(inline)]
pub use config::*;
