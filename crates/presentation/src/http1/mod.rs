//! The HTTP/1.x presentation.
//!
//! The value tuple of an HTTP presentation is `(HttpRequest, HttpResponse)`.
//! Which member is read and which is written depends on the role:
//!
//! | role   | codec               | `read()` fills | `write()` sends |
//! |--------|---------------------|----------------|-----------------|
//! | server | [`HttpServerCodec`] | request        | response        |
//! | client | [`HttpClientCodec`] | response       | request         |
//!
//! The other member is left alone by both directions, so a server can build
//! its response while the request is still being read.

pub(crate) mod codec;
mod message;

use bytes::BytesMut;

pub use message::{Header, HttpRequest, HttpResponse};

use crate::error::{ParseError, SendError};
use crate::{Codec, Presentation, Presentations};
use codec::{MessageEncoder, decode_message};
use tokio_util::codec::Encoder;
use tracing::warn;

/// The values exchanged by an HTTP presentation.
pub type HttpReqRes = (HttpRequest, HttpResponse);

/// Server role: reads requests, writes responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpServerCodec;

impl Codec for HttpServerCodec {
    type Values = HttpReqRes;

    fn decode(values: &mut HttpReqRes, src: &mut BytesMut) -> Result<(), ParseError> {
        decode_message(&mut values.0, src)
    }

    fn encode(values: &mut HttpReqRes, dst: &mut BytesMut) -> Result<(), SendError> {
        MessageEncoder.encode(&mut values.1, dst)
    }
}

/// Client role: writes requests, reads responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientCodec;

impl Codec for HttpClientCodec {
    type Values = HttpReqRes;

    fn decode(values: &mut HttpReqRes, src: &mut BytesMut) -> Result<(), ParseError> {
        decode_message(&mut values.1, src)?;
        // a server does not pipeline responses, leftovers are body bytes the
        // headers did not account for
        if values.1.is_finished() && !src.is_empty() {
            warn!(status = values.1.status().as_u16(), stranded = src.len(), "bytes left after a complete response");
        }
        Ok(())
    }

    fn encode(values: &mut HttpReqRes, dst: &mut BytesMut) -> Result<(), SendError> {
        MessageEncoder.encode(&mut values.0, dst)
    }
}

pub type HttpPresentation = Presentation<HttpServerCodec>;
pub type HttpClientPresentation = Presentation<HttpClientCodec>;
pub type HttpPresentations = Presentations<HttpServerCodec>;
pub type HttpClientPresentations = Presentations<HttpClientCodec>;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::{HOST, HeaderValue, TRANSFER_ENCODING};
    use http::{Method, StatusCode, Uri};

    #[test]
    fn roles_use_opposite_members() {
        let mut wire = BytesMut::new();

        let mut client: HttpReqRes = (HttpRequest::new(Method::GET, Uri::from_static("/")), HttpResponse::default());
        client.0.push_header(HOST, HeaderValue::from_static("x"));
        client.0.finish();
        HttpClientCodec::encode(&mut client, &mut wire).unwrap();

        let mut server = HttpReqRes::default();
        HttpServerCodec::decode(&mut server, &mut wire).unwrap();
        assert_eq!(server.0.host(), Some("x"));
        assert!(!server.1.status_line_finished());

        server.1.set_status(StatusCode::ACCEPTED);
        server.1.push_header(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        server.1.push_chunk(Bytes::from_static(b"ok"));
        server.1.finish();
        HttpServerCodec::encode(&mut server, &mut wire).unwrap();
        assert!(server.0.is_complete());

        HttpClientCodec::decode(&mut client, &mut wire).unwrap();
        assert_eq!(client.1.status(), StatusCode::ACCEPTED);
        assert_eq!(&client.1.body()[..], b"ok");
        assert!(client.1.is_finished());
        assert!(wire.is_empty());
    }

    #[test]
    fn unframed_response_leaves_body_in_buffer() {
        let mut wire = BytesMut::from("HTTP/1.1 200 OK\r\nServer: old\r\n\r\nuntil close");
        let mut client = HttpReqRes::default();

        HttpClientCodec::decode(&mut client, &mut wire).unwrap();

        assert!(client.1.is_finished());
        assert!(client.1.body().is_empty());
        assert_eq!(&wire[..], b"until close");
    }
}
