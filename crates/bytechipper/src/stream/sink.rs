//! # Token Sinks
//!
//! The executor settles the token stream from the front, and hands the
//! settled prefix to a [`TokenSink`]. A rare boundary repair may reach
//! back past the tokens it still holds; [`TokenSink::pop_tokens`] returns
//! the most recent tokens for re-merging.

use std::{
    fs,
    io::{BufWriter, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    errors::{BCResult, BytechipperError},
    stream::TokenWidth,
    types::{ContentType, SymbolId},
};

/// An append-only token destination which can give back its tail.
pub trait TokenSink {
    /// The number of symbols held.
    fn len(&self) -> usize;

    /// Is the sink empty?
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The last symbol held.
    fn last(&self) -> Option<SymbolId>;

    /// Append symbols, in order.
    fn push_tokens(
        &mut self,
        tokens: &[SymbolId],
    ) -> BCResult<()>;

    /// Remove and return the last `count` symbols, in order.
    ///
    /// Returns fewer than `count` when the sink holds fewer.
    fn pop_tokens(
        &mut self,
        count: usize,
    ) -> BCResult<Vec<SymbolId>>;
}

impl TokenSink for Vec<SymbolId> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn last(&self) -> Option<SymbolId> {
        self.as_slice().last().copied()
    }

    fn push_tokens(
        &mut self,
        tokens: &[SymbolId],
    ) -> BCResult<()> {
        self.extend_from_slice(tokens);
        Ok(())
    }

    fn pop_tokens(
        &mut self,
        count: usize,
    ) -> BCResult<Vec<SymbolId>> {
        let at = Vec::len(self).saturating_sub(count);
        Ok(self.split_off(at))
    }
}

impl<S: TokenSink + ?Sized> TokenSink for &mut S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn last(&self) -> Option<SymbolId> {
        (**self).last()
    }

    fn push_tokens(
        &mut self,
        tokens: &[SymbolId],
    ) -> BCResult<()> {
        (**self).push_tokens(tokens)
    }

    fn pop_tokens(
        &mut self,
        count: usize,
    ) -> BCResult<Vec<SymbolId>> {
        (**self).pop_tokens(count)
    }
}

/// Streams a token file into a temporary file beside its destination.
///
/// [`TokenFileWriter::persist`] syncs it and renames it over the
/// destination. Dropping the writer instead removes the temporary file,
/// leaving any existing destination untouched.
#[derive(Debug)]
pub struct TokenFileWriter {
    path: PathBuf,
    file: BufWriter<NamedTempFile>,
    width: TokenWidth,
    header: u64,
    count: usize,
    last: Option<SymbolId>,
}

impl TokenFileWriter {
    /// Start a token file at `path`, writing the marker if `content_type` is set.
    ///
    /// ## Errors
    /// [`BytechipperError::Io`] if `path` is a directory, or its directory is not writable.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: TokenWidth,
        content_type: Option<ContentType>,
    ) -> BCResult<Self> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if fs::metadata(path).is_ok_and(|m| m.is_dir()) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::IsADirectory,
                format!("output path {} is a directory", path.display()),
            )
            .into());
        }

        let tmp = tempfile::Builder::new()
            .prefix(".bytechipper-")
            .suffix(".tmp")
            .tempfile_in(dir)?;

        let mut writer = Self {
            path: path.to_path_buf(),
            file: BufWriter::new(tmp),
            width,
            header: 0,
            count: 0,
            last: None,
        };
        if let Some(content_type) = content_type {
            writer.put(width.marker(content_type))?;
            writer.header = width.bytes() as u64;
        }
        Ok(writer)
    }

    /// The destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The symbol width.
    pub fn width(&self) -> TokenWidth {
        self.width
    }

    /// The bytes written so far, including the marker.
    pub fn written(&self) -> u64 {
        self.header + (self.count * self.width.bytes()) as u64
    }

    fn put(
        &mut self,
        value: u32,
    ) -> BCResult<()> {
        match self.width {
            TokenWidth::U16 => self.file.write_all(&(value as u16).to_be_bytes())?,
            TokenWidth::U32 => self.file.write_all(&value.to_be_bytes())?,
        }
        Ok(())
    }

    /// Sync the file, and rename it over the destination.
    ///
    /// ## Returns
    /// The number of bytes written.
    pub fn persist(self) -> BCResult<u64> {
        let written = self.written();
        let tmp = self.file.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        log::debug!("wrote {written} bytes to {}", self.path.display());
        Ok(written)
    }
}

impl TokenSink for TokenFileWriter {
    fn len(&self) -> usize {
        self.count
    }

    fn last(&self) -> Option<SymbolId> {
        self.last
    }

    fn push_tokens(
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
            self.count += 1;
        }
        if let Some(&token) = tokens.last() {
            self.last = Some(token);
        }
        Ok(())
    }

    fn pop_tokens(
        &mut self,
        count: usize,
    ) -> BCResult<Vec<SymbolId>> {
        let take = count.min(self.count);
        if take == 0 {
            return Ok(Vec::new());
        }
        let keep = self.count - take;
        let size = self.width.bytes();

        // Read the popped symbols, and the one before them.
        let from = keep.saturating_sub(1);
        let mut bytes = vec![0u8; (self.count - from) * size];

        self.file.flush()?;
        let tmp = self.file.get_mut();
        tmp.seek(SeekFrom::Start(self.header + (from * size) as u64))?;
        tmp.read_exact(&mut bytes)?;

        let end = self.header + (keep * size) as u64;
        tmp.as_file().set_len(end)?;
        tmp.seek(SeekFrom::Start(end))?;

        let mut symbols = bytes
            .chunks_exact(size)
            .map(|b| self.width.decode(b))
            .collect::<Vec<_>>();
        self.last = if keep == 0 {
            None
        } else {
            Some(symbols.remove(0))
        };
        self.count = keep;

        log::trace!("re-read {take} symbols from {}", self.path.display());
        Ok(symbols)
    }
}
