//! Resumable serializer for HTTP messages.
//!
//! Each call writes only what was added to the message since the previous
//! call: the start line once, then headers and chunks from their cursors
//! onwards. The output for one call is built in a scratch buffer and appended
//! to the destination in one step, so on error nothing is staged.
//!
//! Headers pushed after the blank line ending the header block was written
//! can no longer be sent. The call that finds them fails with
//! [`SendError::HeaderAfterBody`] and moves the header cursor past them;
//! chunks stay where they were and go out on the next call.

use bytes::{BufMut, BytesMut};
use http::header::TRANSFER_ENCODING;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::{trace, warn};

use crate::error::SendError;
use crate::http1::codec::head_decoder::is_chunked;
use crate::http1::message::{FastWrite, HttpMessage, find_header};

const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

#[derive(Debug, Default)]
pub(crate) struct MessageEncoder;

impl<'a, M: HttpMessage> Encoder<&'a mut M> for MessageEncoder {
    type Error = SendError;

    fn encode(&mut self, message: &'a mut M, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut scratch = BytesMut::new();

        let write_start_line = !message.start_line_done();
        if write_start_line {
            message.encode_start_line(&mut scratch)?;
        }

        let state = message.state();
        let new_headers = &state.headers[state.next_header..];
        if state.header_block_closed {
            if let Some((name, _)) = new_headers.first() {
                // late headers are dropped, the body can still be written
                let error = SendError::header_after_body(name);
                warn!(skipped = new_headers.len(), cause = %error, "dropping headers written after the body");
                let state = message.state_mut();
                state.next_header = state.headers.len();
                return Err(error);
            }
        }

        for (name, value) in new_headers {
            scratch.put_slice(name.as_ref());
            scratch.put_slice(b": ");
            scratch.put_slice(value.as_bytes());
            scratch.put_slice(b"\r\n");
        }

        let new_chunks = &state.chunks[state.next_chunk..];
        let close_header_block = !state.header_block_closed && (!new_chunks.is_empty() || state.finished);
        if close_header_block {
            scratch.put_slice(b"\r\n");
        }

        let chunked = is_chunked(find_header(&state.headers, TRANSFER_ENCODING.as_str()));
        for chunk in new_chunks {
            if !chunked {
                scratch.put_slice(chunk);
            } else if !chunk.is_empty() {
                write!(FastWrite(&mut scratch), "{:X}\r\n", chunk.len())?;
                scratch.put_slice(chunk);
                scratch.put_slice(b"\r\n");
            }
        }

        let write_end = state.finished && !state.end_sent;
        if write_end && chunked {
            scratch.put_slice(LAST_CHUNK);
        }

        trace!(
            start_line = write_start_line,
            headers = new_headers.len(),
            chunks = new_chunks.len(),
            end = write_end,
            len = scratch.len(),
            "encoded message"
        );

        dst.extend_from_slice(&scratch);
        if write_start_line {
            message.set_start_line_done();
        }
        let state = message.state_mut();
        state.next_header = state.headers.len();
        state.next_chunk = state.chunks.len();
        state.header_block_closed |= close_header_block;
        state.end_sent |= write_end;
        Ok(())
    }
}
