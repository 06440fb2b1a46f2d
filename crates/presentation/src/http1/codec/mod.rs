//! Byte-level conversion between session buffers and HTTP messages.
//!
//! Both directions are resumable: they can be driven again and again against
//! the same message as more bytes arrive or more parts are appended.
//!
//! - Reading: [`decode_message`] parses the head with `httparse` through
//!   [`RequestHeadDecoder`] / [`ResponseHeadDecoder`], then feeds the body to a
//!   [`PayloadDecoder`] picked from the headers (content-length, chunked or
//!   none). Incomplete input consumes nothing and is not an error.
//! - Writing: [`MessageEncoder`] serializes whatever lies past the message's
//!   cursors and moves the cursors to the end.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: 8KB

mod chunked_decoder;
mod head_decoder;
mod length_decoder;
mod message_decoder;
mod message_encoder;
mod payload;
mod payload_decoder;

pub(crate) use head_decoder::{RequestHead, RequestHeadDecoder, ResponseHead, ResponseHeadDecoder};
pub(crate) use message_decoder::decode_message;
pub(crate) use message_encoder::MessageEncoder;
pub(crate) use payload::{PayloadItem, PayloadSize};
pub(crate) use payload_decoder::PayloadDecoder;

/// Maximum number of headers in one message head
pub(crate) const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes of one message head
pub(crate) const MAX_HEADER_BYTES: usize = 8 * 1024;
