//! Byte sources with separate peek and read cursors.
//!
//! Header inspection only moves the peek cursor, so a failed read leaves the
//! durable position untouched and the whole operation can be retried.
//! Committed progress is made only through `skip_fully`.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::trace;

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{Result, WavError};

/// Default number of bytes requested from the source per read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8192;

/// A source that supports non-destructive look-ahead and destructive skips.
pub trait ExtractorInput {
    /// Fill `buf` from the peek position and advance the peek position by
    /// `buf.len()`. The durable position is not moved.
    ///
    /// On failure the peek position is reset to the durable position.
    fn peek_fully(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Advance the peek position by `len` bytes without copying them out.
    /// Implementations may defer reading, so running past the end of the
    /// stream can surface on the next peek instead.
    ///
    /// On failure the peek position is reset to the durable position.
    fn advance_peek_position(&mut self, len: u64) -> Result<()>;

    /// Move the peek position back to the durable position.
    fn reset_peek_position(&mut self);

    /// Consume `len` bytes from the durable position. The peek position is
    /// moved to the new durable position.
    ///
    /// Either all `len` bytes are skipped or the durable position is unchanged.
    fn skip_fully(&mut self, len: u64) -> Result<()>;

    /// Absolute durable position in the stream.
    fn position(&self) -> u64;

    /// Absolute peek position in the stream.
    fn peek_position(&self) -> u64;
}

impl<T: ExtractorInput + ?Sized> ExtractorInput for &mut T {
    fn peek_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).peek_fully(buf)
    }

    fn advance_peek_position(&mut self, len: u64) -> Result<()> {
        (**self).advance_peek_position(len)
    }

    fn reset_peek_position(&mut self) {
        (**self).reset_peek_position()
    }

    fn skip_fully(&mut self, len: u64) -> Result<()> {
        (**self).skip_fully(len)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn peek_position(&self) -> u64 {
        (**self).peek_position()
    }
}

/// `ExtractorInput` over any seekable reader.
///
/// Peeked bytes are kept in a look-ahead buffer, so a retried peek is served
/// from memory instead of re-reading the source. Advancing the peek position
/// past the buffer does no I/O; the next peek seeks to the new offset.
pub struct StreamInput<R> {
    inner: R,
    position: u64,
    peek_offset: u64,
    lookahead: Vec<u8>,
    /// Absolute offset of `lookahead[0]`. The source sits at the end of the
    /// buffer.
    lookahead_start: u64,
    read_chunk_size: usize,
    cancel: CancellationToken,
}

impl<R: Read + Seek> StreamInput<R> {
    /// Wrap a reader positioned at absolute offset 0.
    pub fn new(inner: R) -> Self {
        Self::with_position(inner, 0)
    }

    /// Wrap a reader whose current offset is `position`.
    pub fn with_position(inner: R, position: u64) -> Self {
        StreamInput {
            inner,
            position,
            peek_offset: 0,
            lookahead: Vec::new(),
            lookahead_start: position,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Number of bytes read from the source but not yet consumed.
    pub fn buffered_len(&self) -> usize {
        self.lookahead.len()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(WavError::Cancelled);
        }
        Ok(())
    }

    fn lookahead_end(&self) -> u64 {
        self.lookahead_start + self.lookahead.len() as u64
    }

    /// Seek the source to absolute `offset` and drop the look-ahead buffer.
    /// The buffer is kept if the seek fails.
    fn reposition(&mut self, offset: u64) -> Result<()> {
        self.check_cancelled()?;

        let delta = i64::try_from(i128::from(offset) - i128::from(self.lookahead_end()))
            .map_err(|_| invalid_input(format!("cannot seek to offset {}", offset)))?;
        self.inner.seek(SeekFrom::Current(delta))?;
        self.lookahead.clear();
        self.lookahead_start = offset;
        trace!("Repositioned source to offset {}", offset);
        Ok(())
    }

    /// Read from the source until the buffer reaches absolute offset `end`.
    fn fill_to(&mut self, end: u64) -> Result<()> {
        while self.lookahead_end() < end {
            self.check_cancelled()?;

            let start = self.lookahead.len();
            let needed = usize::try_from(end - self.lookahead_end())
                .map_err(|_| invalid_input(format!("cannot buffer up to offset {}", end)))?;
            self.lookahead.resize(start + needed.max(self.read_chunk_size), 0);

            match self.inner.read(&mut self.lookahead[start..]) {
                Ok(0) => {
                    self.lookahead.truncate(start);
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "stream ended at offset {} while {} bytes were needed",
                            self.lookahead_end(),
                            needed
                        ),
                    )
                    .into());
                }
                Ok(n) => {
                    self.lookahead.truncate(start + n);
                    trace!(
                        "Buffered {} bytes at offset {}",
                        n,
                        self.lookahead_start + start as u64
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.lookahead.truncate(start);
                }
                Err(e) => {
                    self.lookahead.truncate(start);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    fn read_at_peek_position(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.peek_position();
        let end = start
            .checked_add(buf.len() as u64)
            .ok_or_else(|| invalid_input(format!("cannot peek {} bytes ahead", buf.len())))?;

        if start < self.lookahead_start || start > self.lookahead_end() {
            self.reposition(start)?;
        }
        self.fill_to(end)?;

        let from = (start - self.lookahead_start) as usize;
        buf.copy_from_slice(&self.lookahead[from..from + buf.len()]);
        self.peek_offset += buf.len() as u64;
        Ok(())
    }
}

fn invalid_input(message: String) -> WavError {
    WavError::Io(io::Error::new(io::ErrorKind::InvalidInput, message))
}

impl StreamInput<BufReader<File>> {
    /// Open a file for header scanning using the configured read size.
    pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(StreamInput::new(BufReader::new(file)).with_read_chunk_size(config.read_chunk_size()))
    }
}

impl<R: Read + Seek> ExtractorInput for StreamInput<R> {
    fn peek_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        let result = self.read_at_peek_position(buf);
        if result.is_err() {
            self.reset_peek_position();
        }
        result
    }

    fn advance_peek_position(&mut self, len: u64) -> Result<()> {
        match self.peek_offset.checked_add(len) {
            Some(offset) if self.position.checked_add(offset).is_some() => {
                self.peek_offset = offset;
                Ok(())
            }
            _ => {
                self.reset_peek_position();
                Err(invalid_input(format!("cannot advance peek position by {}", len)))
            }
        }
    }

    fn reset_peek_position(&mut self) {
        self.peek_offset = 0;
    }

    fn skip_fully(&mut self, len: u64) -> Result<()> {
        self.check_cancelled()?;

        let target = self
            .position
            .checked_add(len)
            .ok_or_else(|| invalid_input(format!("cannot skip {} bytes", len)))?;
        if target >= self.lookahead_start && target <= self.lookahead_end() {
            self.lookahead.drain(..(target - self.lookahead_start) as usize);
            self.lookahead_start = target;
        } else {
            self.reposition(target)?;
        }

        self.position = target;
        self.peek_offset = 0;
        trace!("Skipped {} bytes; position now {}", len, self.position);
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn peek_position(&self) -> u64 {
        self.position + self.peek_offset
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{self, Cursor, Read, Seek, SeekFrom};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Reader that hands out small reads and fails on demand.
    pub struct FlakyReader {
        inner: Cursor<Vec<u8>>,
        max_read: usize,
        fail_after: Arc<AtomicUsize>,
    }

    impl FlakyReader {
        /// Returns the reader and a handle holding the number of reads or
        /// seeks that succeed before the next one fails. `usize::MAX`
        /// disarms it; a failure also disarms it.
        pub fn new(data: Vec<u8>, max_read: usize) -> (Self, Arc<AtomicUsize>) {
            let fail_after = Arc::new(AtomicUsize::new(usize::MAX));
            let reader = FlakyReader {
                inner: Cursor::new(data),
                max_read,
                fail_after: Arc::clone(&fail_after),
            };
            (reader, fail_after)
        }

        fn take_failure(&self) -> bool {
            let previous = self
                .fail_after
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                    usize::MAX => None,
                    0 => Some(usize::MAX),
                    n => Some(n - 1),
                });
            previous == Ok(0)
        }
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.take_failure() {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "transient"));
            }
            let len = buf.len().min(self.max_read);
            self.inner.read(&mut buf[..len])
        }
    }

    impl Seek for FlakyReader {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            if self.take_failure() {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "transient"));
            }
            self.inner.seek(pos)
        }
    }
}
