//! # Common Types

use core::fmt;

/// A symbol identifier.
///
/// Ids ``0..=255`` denote raw bytes; ids ``>= 256`` denote merged symbols.
pub type SymbolId = u32;

/// The priority of a merge rule; lower ranks merge first.
pub type Rank = u32;

/// A pair of adjacent symbols.
pub type Pair = (SymbolId, SymbolId);

/// The number of raw byte symbols.
pub const BYTE_SYMBOL_COUNT: usize = 256;

/// The first symbol id of the reserved marker range.
///
/// Merged ids must stay below this value; the serialized stream uses
/// this range for content-type markers.
pub const RESERVED_SYMBOL_BASE: SymbolId = 0xFFFF_FF00;

/// Is this symbol a raw byte?
#[inline(always)]
pub fn is_byte_symbol(symbol: SymbolId) -> bool {
    symbol < BYTE_SYMBOL_COUNT as SymbolId
}

/// The content-type hint for a tokenize run.
///
/// When set, a marker symbol identifying the content type is written
/// ahead of the token stream.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::VariantArray
)]
#[strum(ascii_case_insensitive)]
pub enum ContentType {
    /// Plain text content.
    Text,

    /// Generic binary content.
    Bin,
}

impl ContentType {
    /// The marker low byte for this content type.
    ///
    /// The full marker is ``0xFF00 | low`` in 2-byte streams, and
    /// ``0xFFFF_FF00 | low`` in 4-byte streams.
    pub fn marker_low(&self) -> u8 {
        match self {
            ContentType::Text => 0x01,
            ContentType::Bin => 0x03,
        }
    }

    /// The canonical name of this content type.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Look up a content type from its marker low byte.
    pub fn from_marker_low(low: u8) -> Option<Self> {
        use strum::VariantArray;
        ContentType::VARIANTS
            .iter()
            .copied()
            .find(|ct| ct.marker_low() == low)
    }
}

impl fmt::Display for ContentType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "ahash")] {
        /// Type Alias for hash maps in this crate.
        pub type BCHashMap<K, V> = ahash::AHashMap<K, V>;

        /// Create a new hash map with the given capacity.
        pub fn hash_map_with_capacity<K, V>(capacity: usize) -> BCHashMap<K, V> {
            BCHashMap::with_capacity(capacity)
        }

        /// Type Alias for hash sets in this crate.
        pub type BCHashSet<V> = ahash::AHashSet<V>;
    } else {
        /// Type Alias for hash maps in this crate.
        pub type BCHashMap<K, V> = std::collections::HashMap<K, V>;

        /// Create a new hash map with the given capacity.
        pub fn hash_map_with_capacity<K, V>(capacity: usize) -> BCHashMap<K, V> {
            BCHashMap::with_capacity(capacity)
        }

        /// Type Alias for hash sets in this crate.
        pub type BCHashSet<V> = std::collections::HashSet<V>;
    }
}
