//! Splits an input byte stream into [`TextRecord`]s.
//!
//! Unlike `tokio_util::codec::LinesCodec`, this codec keeps the terminator
//! and never requires UTF-8: records are relayed byte-for-byte. Like it, an
//! optional length cap discards over-long lines instead of failing the stream.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::warn;

use crate::error::CodecError;
use crate::record::TextRecord;

const TERMINATOR: u8 = b'\n';

/// Newline-delimited record decoder.
#[derive(Debug, Clone, Default)]
pub struct RecordCodec {
    /// Index into the buffer up to which a terminator has already been
    /// searched for, so partial lines are not rescanned on every read.
    next_index: usize,

    /// Maximum record length, terminator included. `None` means unbounded.
    max_length: Option<usize>,

    /// Bytes of the current over-long line dropped so far, while skipping
    /// to its terminator.
    discarding: Option<usize>,
}

impl RecordCodec {
    /// Creates a codec that accepts lines of any length.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec that skips records longer than `max_length` bytes.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::default()
        }
    }

    fn exceeds_max(&self, len: usize) -> bool {
        self.max_length.is_some_and(|max| len > max)
    }

    fn skipped(&self, bytes: usize) {
        warn!(
            bytes,
            max = self.max_length.unwrap_or_default(),
            "Skipped over-long input line"
        );
    }
}

impl Decoder for RecordCodec {
    type Item = TextRecord;
    type Error = CodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<TextRecord>, CodecError> {
        loop {
            let terminator_at = buf
                .get(self.next_index..)
                .and_then(|unscanned| unscanned.iter().position(|b| *b == TERMINATOR))
                .map(|offset| self.next_index + offset);

            match (self.discarding, terminator_at) {
                (Some(dropped), Some(idx)) => {
                    // End of the over-long line; resume with what follows it.
                    buf.advance(idx + 1);
                    self.next_index = 0;
                    self.discarding = None;
                    self.skipped(dropped + idx + 1);
                }
                (Some(dropped), None) => {
                    self.discarding = Some(dropped + buf.len());
                    buf.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                (None, Some(idx)) => {
                    self.next_index = 0;
                    let end = idx + 1;
                    if self.exceeds_max(end) {
                        buf.advance(end);
                        self.skipped(end);
                        continue;
                    }
                    return Ok(Some(TextRecord::new(buf.split_to(end).freeze())));
                }
                (None, None) if self.exceeds_max(buf.len()) => {
                    self.discarding = Some(0);
                }
                (None, None) => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<TextRecord>, CodecError> {
        if let Some(record) = self.decode(buf)? {
            return Ok(Some(record));
        }
        if let Some(dropped) = self.discarding.take() {
            self.skipped(dropped);
            return Ok(None);
        }
        if buf.is_empty() {
            return Ok(None);
        }
        // Final line without a terminator.
        self.next_index = 0;
        let len = buf.len();
        Ok(Some(TextRecord::new(buf.split_to(len).freeze())))
    }
}
