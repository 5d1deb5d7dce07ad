//! # Token Stream Reader

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::{
    errors::{BCResult, BytechipperError},
    stream::TokenWidth,
    types::{ContentType, SymbolId},
};

/// A parsed token stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    /// The content type, if the stream starts with a marker.
    pub content_type: Option<ContentType>,

    /// The symbols, in order.
    pub tokens: Vec<SymbolId>,
}

/// Parse a serialized token stream.
///
/// ## Errors
/// [`BytechipperError::InvalidTokenStream`] on a truncated symbol, an
/// unknown marker, or a marker after the first position.
pub fn read_token_stream<R: Read>(
    mut reader: R,
    width: TokenWidth,
) -> BCResult<TokenStream> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let size = width.bytes();
    if bytes.len() % size != 0 {
        return Err(BytechipperError::InvalidTokenStream(format!(
            "{} bytes is not a whole number of {size}-byte symbols",
            bytes.len()
        )));
    }

    let symbols = bytes.chunks_exact(size).map(|b| width.decode(b));

    let marker_base = width.marker_base();
    let mut stream = TokenStream {
        content_type: None,
        tokens: Vec::with_capacity(bytes.len() / size),
    };

    for (idx, symbol) in symbols.enumerate() {
        if symbol < marker_base {
            stream.tokens.push(symbol);
            continue;
        }
        if idx != 0 {
            return Err(BytechipperError::InvalidTokenStream(format!(
                "marker {symbol:#x} at position {idx}"
            )));
        }
        let low = (symbol - marker_base) as u8;
        match ContentType::from_marker_low(low) {
            Some(content_type) => stream.content_type = Some(content_type),
            None => {
                return Err(BytechipperError::InvalidTokenStream(format!(
                    "unknown content marker {symbol:#x}"
                )));
            }
        }
    }

    Ok(stream)
}

/// Read a token stream file.
pub fn read_token_file<P: AsRef<Path>>(
    path: P,
    width: TokenWidth,
) -> BCResult<TokenStream> {
    read_token_stream(BufReader::new(File::open(path)?), width)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::stream::write_token_stream;

    #[test]
    fn test_read_plain() {
        let stream =
            read_token_stream(Cursor::new(vec![0x01, 0x00, 0x00, 0x63]), TokenWidth::U16).unwrap();
        assert_eq!(
            stream,
            TokenStream {
                content_type: None,
                tokens: vec![256, 99],
            }
        );
        assert_eq!(
            read_token_stream(Cursor::new(vec![]), TokenWidth::U32).unwrap(),
            TokenStream::default()
        );
    }

    #[test]
    fn test_read_marked() {
        for width in [TokenWidth::U16, TokenWidth::U32] {
            let mut buf = Vec::new();
            write_token_stream(&mut buf, &[97, 300], width, Some(ContentType::Bin)).unwrap();

            let stream = read_token_stream(Cursor::new(buf), width).unwrap();
            assert_eq!(stream.content_type, Some(ContentType::Bin));
            assert_eq!(stream.tokens, vec![97, 300]);
        }
    }

    #[test]
    fn test_read_invalid() {
        let cases: [(&[u8], TokenWidth); 4] = [
            (&[0x01, 0x00, 0x00], TokenWidth::U16),
            (&[0x00, 0x61, 0xFF, 0x01], TokenWidth::U16),
            (&[0xFF, 0x02], TokenWidth::U16),
            (&[0x00, 0x00, 0x00], TokenWidth::U32),
        ];
        for (bytes, width) in cases {
            assert!(matches!(
                read_token_stream(Cursor::new(bytes), width),
                Err(BytechipperError::InvalidTokenStream(_))
            ));
        }
    }
}
