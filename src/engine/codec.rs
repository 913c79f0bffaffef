//! Lossy line codec for engine output streams.
//!
//! The engine writes newline-delimited text on both stdout and stderr. Its
//! output is not guaranteed to be valid UTF-8, so unlike
//! [`tokio_util::codec::LinesCodec`] this codec replaces undecodable bytes
//! instead of failing the stream.
//!
//! # Usage
//!
//! Use [`EngineLineCodec`] as the codec parameter for
//! [`tokio_util::codec::FramedRead`].
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use contribute_relay::engine::codec::EngineLineCodec;
//!
//! let lines = FramedRead::new(child_stdout, EngineLineCodec::new());
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::warn;

use crate::{AppError, Result};

/// Maximum line length accepted by the codec: 1 MiB.
///
/// A line exceeding this limit is discarded up to its terminating newline and
/// logged once at `WARN`; decoding then resumes with the following line.
/// The codec never fails the stream for content, only for I/O.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Newline-delimited, permissively decoded line codec.
#[derive(Debug)]
pub struct EngineLineCodec {
    max_length: usize,
    /// Bytes already scanned for a newline in the current buffer.
    next_index: usize,
    /// Set while skipping the remainder of an over-long line.
    discarding: bool,
}

impl EngineLineCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec with a custom line limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }
}

impl Default for EngineLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EngineLineCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next newline-terminated line from `src`.
    ///
    /// Returns `Ok(None)` when `src` contains no complete line yet.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let read_to = src.len().min(self.max_length.saturating_add(1));
            let newline = src[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    src.advance(offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    src.advance(read_to);
                    self.next_index = 0;
                    if src.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let line = src.split_to(offset + 1);
                    self.next_index = 0;
                    return Ok(Some(decode_lossy(&line[..offset])));
                }
                (false, None) if src.len() > self.max_length => {
                    warn!(
                        max_bytes = self.max_length,
                        "engine line too long, discarding"
                    );
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    /// Flush a final unterminated line when the stream reaches EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() || self.discarding {
            src.clear();
            self.discarding = false;
            return Ok(None);
        }
        let rest = src.split_to(src.len());
        Ok(Some(decode_lossy(&rest)))
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences, and drop a trailing `\r`.
fn decode_lossy(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
