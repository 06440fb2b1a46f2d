use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::error::ParseError;
use crate::http1::codec::PayloadItem;
use crate::http1::message::HttpMessage;

/// Moves as much of a message as is available from `src` into `message`.
///
/// The first call that sees a whole head replaces the start line and the
/// headers; every call after that appends the body bytes found to the chunk
/// list. Bytes belonging to an incomplete head stay in `src` untouched. Once
/// the end of the body has been read the message is finished and further
/// calls leave both `message` and `src` alone, so a pipelined next message is
/// never consumed.
pub(crate) fn decode_message<M: HttpMessage>(message: &mut M, src: &mut BytesMut) -> Result<(), ParseError> {
    if !message.start_line_done() {
        match M::HeadDecoder::default().decode(src)? {
            Some((head, payload_size)) => {
                trace!(chunked = payload_size.is_chunked(), empty = payload_size.is_empty(), "read message head");
                message.apply_head(head, payload_size);
            }
            None => return Ok(()),
        }
    }

    let state = message.state_mut();
    let Some(payload_decoder) = state.payload_decoder.as_mut() else {
        return Ok(());
    };

    loop {
        match payload_decoder.decode(src)? {
            Some(PayloadItem::Chunk(bytes)) => {
                trace!(len = bytes.len(), "read body chunk");
                state.chunks.push(bytes);
                state.next_chunk = state.chunks.len();
            }
            Some(PayloadItem::Eof) => {
                state.payload_decoder = None;
                state.finished = true;
                state.end_sent = true;
                return Ok(());
            }
            None => return Ok(()),
        }
    }
}
