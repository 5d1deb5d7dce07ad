//! # Token Stream Writer

use std::{io::Write, path::Path};

use crate::{
    errors::{BCResult, BytechipperError},
    stream::{TokenFileWriter, TokenSink},
    table::MergeTable,
    types::{ContentType, RESERVED_SYMBOL_BASE, SymbolId},
};

/// The reserved marker range of 2-byte streams.
pub const U16_MARKER_BASE: u32 = 0xFF00;

/// The serialized width of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum TokenWidth {
    /// Big-endian `u16` symbols.
    U16,

    /// Big-endian `u32` symbols.
    U32,
}

impl TokenWidth {
    /// The narrowest width able to hold every symbol `table` can emit,
    /// below the marker range.
    pub fn for_table(table: &MergeTable) -> Self {
        if table.max_symbol() < U16_MARKER_BASE {
            TokenWidth::U16
        } else {
            TokenWidth::U32
        }
    }

    /// The bytes per symbol.
    pub fn bytes(&self) -> usize {
        match self {
            TokenWidth::U16 => 2,
            TokenWidth::U32 => 4,
        }
    }

    /// The first reserved marker value at this width.
    pub fn marker_base(&self) -> u32 {
        match self {
            TokenWidth::U16 => U16_MARKER_BASE,
            TokenWidth::U32 => RESERVED_SYMBOL_BASE,
        }
    }

    /// Decode one big-endian symbol of this width.
    pub fn decode(
        &self,
        bytes: &[u8],
    ) -> u32 {
        match self {
            TokenWidth::U16 => u16::from_be_bytes([bytes[0], bytes[1]]) as u32,
            TokenWidth::U32 => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// The content-type marker at this width.
    pub fn marker(
        &self,
        content_type: ContentType,
    ) -> u32 {
        self.marker_base() | content_type.marker_low() as u32
    }
}

/// Writes symbols as fixed-width big-endian values.
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    writer: W,
    width: TokenWidth,
    written: u64,
}

impl<W: Write> StreamWriter<W> {
    /// Wrap a writer.
    pub fn new(
        writer: W,
        width: TokenWidth,
    ) -> Self {
        Self {
            writer,
            width,
            written: 0,
        }
    }

    /// The symbol width.
    pub fn width(&self) -> TokenWidth {
        self.width
    }

    /// The bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn put(
        &mut self,
        value: u32,
    ) -> BCResult<()> {
        match self.width {
            TokenWidth::U16 => self.writer.write_all(&(value as u16).to_be_bytes())?,
            TokenWidth::U32 => self.writer.write_all(&value.to_be_bytes())?,
        }
        self.written += self.width.bytes() as u64;
        Ok(())
    }

    /// Write the content-type marker.
    pub fn write_marker(
        &mut self,
        content_type: ContentType,
    ) -> BCResult<()> {
        self.put(self.width.marker(content_type))
    }

    /// Write symbols, in order.
    ///
    /// ## Errors
    /// [`BytechipperError::InvalidTokenStream`] if a symbol reaches the marker range.
    pub fn write_tokens(
        &mut self,
        tokens: &[SymbolId],
    ) -> BCResult<()> {
        let limit = self.width.marker_base();
        for &token in tokens {
            if token >= limit {
                return Err(BytechipperError::InvalidTokenStream(format!(
                    "symbol {token} does not fit a {:?} stream",
                    self.width
                )));
            }
            self.put(token)?;
        }
        Ok(())
    }

    /// Flush, and return the inner writer.
    pub fn finish(mut self) -> BCResult<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Serialize a token stream to `writer`.
///
/// ## Returns
/// The number of bytes written.
pub fn write_token_stream<W: Write>(
    writer: W,
    tokens: &[SymbolId],
    width: TokenWidth,
    content_type: Option<ContentType>,
) -> BCResult<u64> {
    let mut stream = StreamWriter::new(writer, width);
    if let Some(content_type) = content_type {
        stream.write_marker(content_type)?;
    }
    stream.write_tokens(tokens)?;
    let written = stream.written();
    stream.finish()?;
    Ok(written)
}

/// Atomically write a token stream file.
///
/// The stream is written to a temporary file next to `path`, synced,
/// then renamed over `path`. On error the temporary file is removed,
/// and any existing file at `path` is left untouched.
///
/// ## Returns
/// The number of bytes written.
pub fn write_token_file<P: AsRef<Path>>(
    path: P,
    tokens: &[SymbolId],
    width: TokenWidth,
    content_type: Option<ContentType>,
) -> BCResult<u64> {
    let mut writer = TokenFileWriter::create(path, width, content_type)?;
    writer.push_tokens(tokens)?;
    writer.persist()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_for_table() {
        let table = MergeTable::build([(97, 98)]).unwrap();
        assert_eq!(TokenWidth::for_table(&table), TokenWidth::U16);
        assert_eq!(TokenWidth::for_table(&MergeTable::default()), TokenWidth::U16);

        let table = MergeTable::build_rules([crate::table::MergeRule::new(97, 98, 0xFF00)]).unwrap();
        assert_eq!(TokenWidth::for_table(&table), TokenWidth::U32);
    }

    #[test]
    fn test_markers() {
        assert_eq!(TokenWidth::U16.marker(ContentType::Text), 0xFF01);
        assert_eq!(TokenWidth::U16.marker(ContentType::Bin), 0xFF03);
        assert_eq!(TokenWidth::U32.marker(ContentType::Text), 0xFFFF_FF01);
        assert_eq!(TokenWidth::U32.marker(ContentType::Bin), 0xFFFF_FF03);
    }

    #[test]
    fn test_write_stream() {
        let mut buf = Vec::new();
        let n = write_token_stream(&mut buf, &[256, 99], TokenWidth::U16, None).unwrap();
        assert_eq!(n, 4);
        assert_eq!(buf, vec![0x01, 0x00, 0x00, 0x63]);

        let mut buf = Vec::new();
        write_token_stream(
            &mut buf,
            &[70_000],
            TokenWidth::U32,
            Some(ContentType::Text),
        )
        .unwrap();
        assert_eq!(buf, vec![0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x01, 0x11, 0x70]);
    }

    #[test]
    fn test_rejects_oversize_symbol() {
        let mut buf = Vec::new();
        let err = write_token_stream(&mut buf, &[1, 0xFF00], TokenWidth::U16, None).unwrap_err();
        assert!(matches!(err, BytechipperError::InvalidTokenStream(_)));
    }

    #[test]
    fn test_write_file_atomically() {
        tempdir::TempDir::new("stream_writer")
            .and_then(|dir| {
                let path = dir.path().join("out.bin");
                std::fs::write(&path, b"previous")?;

                // A failed write leaves the previous file, and no temp files.
                assert!(write_token_file(&path, &[0x1_0000], TokenWidth::U16, None).is_err());
                assert_eq!(std::fs::read(&path)?, b"previous");
                assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);

                let n = write_token_file(&path, &[97, 256], TokenWidth::U16, Some(ContentType::Bin))
                    .unwrap();
                assert_eq!(n, 6);
                assert_eq!(
                    std::fs::read(&path)?,
                    vec![0xFF, 0x03, 0x00, 0x61, 0x01, 0x00]
                );
                assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);

                // Empty stream: an existing, empty file.
                write_token_file(&path, &[], TokenWidth::U16, None).unwrap();
                assert_eq!(std::fs::metadata(&path)?.len(), 0);

                Ok(())
            })
            .unwrap();
    }
}
