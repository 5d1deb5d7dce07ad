//! # Chunk Sizing
//!
//! Byte-size strings, automatic chunk sizing, and lookback selection.

use core::{fmt, num::NonZeroUsize, str::FromStr};

use crate::{
    errors::{BCResult, BytechipperError},
    table::MergeTable,
};

/// One kibibyte.
pub const KIB: usize = 1024;

/// One mebibyte.
pub const MIB: usize = 1024 * KIB;

/// One gibibyte.
pub const GIB: usize = 1024 * MIB;

/// The smallest chunk [`ChunkSize::Auto`] will pick.
pub const MIN_AUTO_CHUNK_SIZE: usize = MIB;

/// The largest chunk [`ChunkSize::Auto`] will pick.
pub const MAX_AUTO_CHUNK_SIZE: usize = 16 * MIB;

/// The smallest lookback used for a non-empty table.
pub const MIN_LOOKBACK: usize = 32;

/// Parse a byte-size string.
///
/// Accepts ``"<digits>"`` (bytes), or ``"<digits>KB"``, ``"<digits>MB"``,
/// ``"<digits>GB"`` (binary multiples, case-insensitive). Surrounding
/// whitespace is ignored.
///
/// ## Errors
/// [`BytechipperError::InvalidConfig`] on a malformed or zero size.
pub fn parse_byte_size(s: &str) -> BCResult<NonZeroUsize> {
    let invalid = |reason: &str| {
        BytechipperError::InvalidConfig(format!("invalid byte size {s:?}: {reason}"))
    };

    let trimmed = s.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, scale) = [("KB", KIB), ("MB", MIB), ("GB", GIB)]
        .into_iter()
        .find_map(|(unit, scale)| upper.strip_suffix(unit).map(|num| (num, scale)))
        .unwrap_or((upper.as_str(), 1));

    if digits.is_empty() {
        return Err(invalid("missing number"));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected digits followed by an optional KB, MB or GB unit"));
    }

    let value = digits
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(scale))
        .ok_or_else(|| invalid("size overflows"))?;

    NonZeroUsize::new(value).ok_or_else(|| invalid("size must be positive"))
}

/// The chunk size policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChunkSize {
    /// Derive from total memory, memory cap and thread count.
    #[default]
    Auto,

    /// A fixed number of bytes.
    Fixed(NonZeroUsize),
}

impl ChunkSize {
    /// A fixed chunk size.
    ///
    /// ## Errors
    /// [`BytechipperError::InvalidConfig`] if `bytes` is zero.
    pub fn fixed(bytes: usize) -> BCResult<Self> {
        NonZeroUsize::new(bytes)
            .map(ChunkSize::Fixed)
            .ok_or_else(|| BytechipperError::InvalidConfig("chunk size must be positive".into()))
    }

    /// Resolve to a concrete size.
    ///
    /// ## Arguments
    /// * `total_memory` - the memory ceiling in bytes.
    /// * `memory_cap` - the usable percentage of `total_memory`.
    /// * `threads` - the worker count.
    pub fn resolve(
        &self,
        total_memory: u64,
        memory_cap: u8,
        threads: NonZeroUsize,
    ) -> usize {
        match self {
            ChunkSize::Fixed(n) => n.get(),
            ChunkSize::Auto => auto_chunk_size(total_memory, memory_cap, threads),
        }
    }
}

impl FromStr for ChunkSize {
    type Err = BytechipperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(ChunkSize::Auto);
        }
        parse_byte_size(s).map(ChunkSize::Fixed)
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ChunkSize::Auto => f.write_str("auto"),
            ChunkSize::Fixed(n) => write!(f, "{}", format_byte_size(n.get())),
        }
    }
}

/// Format a byte count with the largest exact binary unit.
pub fn format_byte_size(bytes: usize) -> String {
    for (unit, scale) in [("GB", GIB), ("MB", MIB), ("KB", KIB)] {
        if bytes >= scale && bytes % scale == 0 {
            return format!("{}{unit}", bytes / scale);
        }
    }
    bytes.to_string()
}

/// Automatic chunk size: ``total * cap% / threads / 4``, clamped to
/// ``[MIN_AUTO_CHUNK_SIZE, MAX_AUTO_CHUNK_SIZE]``.
pub fn auto_chunk_size(
    total_memory: u64,
    memory_cap: u8,
    threads: NonZeroUsize,
) -> usize {
    let usable = (total_memory as u128 * memory_cap.min(100) as u128) / 100;
    let per_thread = usable / threads.get() as u128 / 4;
    per_thread.clamp(MIN_AUTO_CHUNK_SIZE as u128, MAX_AUTO_CHUNK_SIZE as u128) as usize
}

/// Detect total physical memory, in bytes.
///
/// Returns `None` if the platform reports nothing.
pub fn detect_total_memory() -> Option<u64> {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    match sys.total_memory() {
        0 => None,
        total => Some(total),
    }
}

/// The lookback for a table: ``max(max_symbol_len, MIN_LOOKBACK)``,
/// or 0 for an empty table.
pub fn lookback_for(table: &MergeTable) -> usize {
    if table.is_empty() {
        0
    } else {
        table.max_symbol_len().max(MIN_LOOKBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_parse_byte_size_valid() {
        assert_eq!(parse_byte_size("1024").unwrap().get(), 1024);
        assert_eq!(parse_byte_size("1kb").unwrap().get(), KIB);
        assert_eq!(parse_byte_size("1KB").unwrap().get(), KIB);
        assert_eq!(parse_byte_size("2mb").unwrap().get(), 2 * MIB);
        assert_eq!(parse_byte_size("10MB ").unwrap().get(), 10 * MIB);
        assert_eq!(parse_byte_size(" 3GB").unwrap().get(), 3 * GIB);
    }

    #[test]
    fn test_parse_byte_size_invalid() {
        for s in [
            "", "abc", "KB", " MB", "mb1", "1024b", "10.5MB", "10XB", "1.5MB", "-1", "0", "0KB",
            "10 MB",
        ] {
            assert!(
                matches!(parse_byte_size(s), Err(BytechipperError::InvalidConfig(_))),
                "{s:?} should not parse"
            );
        }
        assert!(parse_byte_size("99999999999999999999999GB").is_err());
    }

    #[test]
    fn test_chunk_size_from_str() {
        assert_eq!(ChunkSize::from_str("auto").unwrap(), ChunkSize::Auto);
        assert_eq!(
            ChunkSize::from_str("4MB").unwrap(),
            ChunkSize::Fixed(nz(4 * MIB))
        );
        assert!(ChunkSize::from_str("0").is_err());
        assert!(ChunkSize::fixed(0).is_err());
        assert_eq!(ChunkSize::fixed(7).unwrap(), ChunkSize::Fixed(nz(7)));
    }

    #[test]
    fn test_chunk_size_display() {
        assert_eq!(ChunkSize::Auto.to_string(), "auto");
        assert_eq!(ChunkSize::Fixed(nz(4 * MIB)).to_string(), "4MB");
        assert_eq!(ChunkSize::Fixed(nz(256 * KIB)).to_string(), "256KB");
        assert_eq!(ChunkSize::Fixed(nz(1000)).to_string(), "1000");
    }

    #[test]
    fn test_auto_chunk_size() {
        let gib16 = 16 * GIB as u64;

        // 16GiB * 80% / 8 / 4 = 409.6MiB -> clamped.
        assert_eq!(auto_chunk_size(gib16, 80, nz(8)), MAX_AUTO_CHUNK_SIZE);

        // 64MiB * 50% / 2 / 4 = 4MiB.
        assert_eq!(auto_chunk_size(64 * MIB as u64, 50, nz(2)), 4 * MIB);

        assert_eq!(auto_chunk_size(gib16, 0, nz(8)), MIN_AUTO_CHUNK_SIZE);
        assert_eq!(auto_chunk_size(0, 100, nz(1)), MIN_AUTO_CHUNK_SIZE);

        assert_eq!(
            ChunkSize::Fixed(nz(123)).resolve(gib16, 80, nz(8)),
            123
        );
        assert_eq!(
            ChunkSize::Auto.resolve(64 * MIB as u64, 50, nz(2)),
            4 * MIB
        );
    }

    #[test]
    fn test_lookback_for() {
        assert_eq!(lookback_for(&MergeTable::default()), 0);

        let table = MergeTable::build([(97, 98)]).unwrap();
        assert_eq!(lookback_for(&table), MIN_LOOKBACK);

        // Doubling chain: 2, 4, ..., 64 bytes.
        let pairs = (0..6)
            .map(|i| {
                let s = if i == 0 { 97 } else { 255 + i };
                (s, s)
            })
            .collect::<Vec<_>>();
        let table = MergeTable::build(pairs).unwrap();
        assert_eq!(table.max_symbol_len(), 64);
        assert_eq!(lookback_for(&table), 64);
    }
}
