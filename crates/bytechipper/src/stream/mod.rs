//! # Token Stream Serialization
//!
//! Streams are fixed-width, big-endian symbols; 2 bytes when every
//! symbol of the table fits below ``0xFF00``, else 4 bytes. An optional
//! content-type marker leads the stream:
//!
//! | content type | 2-byte marker | 4-byte marker   |
//! |--------------|---------------|-----------------|
//! | `Text`       | ``0xFF01``    | ``0xFFFF_FF01`` |
//! | `Bin`        | ``0xFF03``    | ``0xFFFF_FF03`` |

mod reader;
mod sink;
mod writer;

#[doc(inline)]
pub use reader::*;
#[doc(inline)]
pub use sink::*;
#[doc(inline)]
pub use writer::*;
