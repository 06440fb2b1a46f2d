//! Body decoder for chunked transfer encoding (RFC 9112 section 7.1).
//!
//! The decoder is a byte-at-a-time state machine for the framing lines and
//! hands out chunk data as soon as it is available, so a chunk split across
//! several reads is returned in several pieces. Chunk extensions and trailer
//! fields are validated for shape and otherwise skipped.

use std::cmp;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::error::ParseError;
use crate::http1::codec::PayloadItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkedDecoder {
    state: ChunkedState,
    /// bytes left in the current chunk, or the size being parsed
    remaining: u64,
    /// at least one hex digit of the current size line was read
    size_seen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    Size,
    SizeLws,
    Extension,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    Trailer,
    TrailerLf,
    EndCr,
    EndLf,
    End,
}

impl ChunkedDecoder {
    pub(crate) fn new() -> Self {
        Self { state: ChunkedState::Size, remaining: 0, size_seen: false }
    }

    fn step(&mut self, byte: u8) -> Result<ChunkedState, ParseError> {
        use ChunkedState::*;

        let next = match (self.state, byte) {
            (Size, b) if b.is_ascii_hexdigit() => {
                let digit = u64::from(hex_value(b));
                self.remaining = self
                    .remaining
                    .checked_mul(16)
                    .and_then(|size| size.checked_add(digit))
                    .ok_or_else(|| ParseError::invalid_body("chunk size overflow"))?;
                self.size_seen = true;
                Size
            }
            (Size, b'\t' | b' ' | b';' | b'\r') if !self.size_seen => {
                return Err(ParseError::invalid_body("missing chunk size"));
            }
            (Size | SizeLws, b'\t' | b' ') => SizeLws,
            (Size | SizeLws, b';') => Extension,
            (Size | SizeLws | Extension, b'\r') => SizeLf,
            (Size, _) => return Err(ParseError::invalid_body("invalid chunk size")),
            (SizeLws, _) => return Err(ParseError::invalid_body("invalid chunk size whitespace")),
            (Extension, b'\n') => return Err(ParseError::invalid_body("chunk extension contains newline")),
            (Extension, _) => Extension,
            (SizeLf, b'\n') if self.remaining == 0 => EndCr,
            (SizeLf, b'\n') => Data,
            (SizeLf, _) => return Err(ParseError::invalid_body("invalid chunk size line ending")),
            (DataCr, b'\r') => DataLf,
            (DataCr, _) => return Err(ParseError::invalid_body("missing CR after chunk data")),
            (DataLf, b'\n') => {
                self.size_seen = false;
                Size
            }
            (DataLf, _) => return Err(ParseError::invalid_body("missing LF after chunk data")),
            (EndCr, b'\r') => EndLf,
            (Trailer, b'\r') => TrailerLf,
            (EndCr | Trailer, _) => Trailer,
            (TrailerLf, b'\n') => EndCr,
            (TrailerLf, _) => return Err(ParseError::invalid_body("invalid trailer line ending")),
            (EndLf, b'\n') => End,
            (EndLf, _) => return Err(ParseError::invalid_body("invalid last chunk line ending")),
            (Data | End, _) => self.state,
        };

        Ok(next)
    }
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkedState::End => {
                    trace!("finished reading chunked data");
                    return Ok(Some(PayloadItem::Eof));
                }

                ChunkedState::Data => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    let read_size =
                        usize::try_from(self.remaining).map_or(src.len(), |remaining| cmp::min(remaining, src.len()));
                    self.remaining -= read_size as u64;
                    if self.remaining == 0 {
                        self.state = ChunkedState::DataCr;
                    }

                    trace!(len = read_size, "read chunked bytes");
                    return Ok(Some(PayloadItem::Chunk(src.split_to(read_size).freeze())));
                }

                _ => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let byte = src.get_u8();
                    self.state = self.step(byte)?;
                }
            }
        }
    }
}
