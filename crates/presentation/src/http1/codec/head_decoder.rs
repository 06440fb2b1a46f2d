//! Decoders for the head of an HTTP/1.x message: the start line and the
//! header fields, up to and including the blank line.
//!
//! Tokenizing is done by `httparse`. The decoders copy the parsed pieces into
//! owned `http` types, remove the head from the source buffer and work out how
//! the body is delimited.
//!
//! Both decoders consume nothing while the head is incomplete, and fail once
//! the incomplete head outgrows [`MAX_HEADER_BYTES`].

use bytes::{Buf, BytesMut};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue, Method, StatusCode, Uri, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::error::ParseError;
use crate::http1::codec::{MAX_HEADER_BYTES, MAX_HEADER_NUM, PayloadSize};
use crate::http1::message::{Header, find_header};

/// A parsed request line and its headers.
#[derive(Debug)]
pub(crate) struct RequestHead {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) version: Version,
    pub(crate) headers: Vec<Header>,
}

/// A parsed status line and its headers.
#[derive(Debug)]
pub(crate) struct ResponseHead {
    pub(crate) version: Version,
    pub(crate) status: StatusCode,
    pub(crate) reason: Option<String>,
    pub(crate) headers: Vec<Header>,
}

#[derive(Debug, Default)]
pub(crate) struct RequestHeadDecoder;

impl Decoder for RequestHeadDecoder {
    type Item = (RequestHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let (head, body_offset) = match req.parse(src).map_err(map_httparse_error)? {
            Status::Complete(body_offset) => {
                ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let method = Method::from_bytes(req.method.ok_or(ParseError::InvalidMethod)?.as_bytes())
                    .map_err(|_| ParseError::InvalidMethod)?;
                let uri = req.path.ok_or(ParseError::InvalidUri)?.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;
                let version = parse_version(req.version)?;
                let headers = copy_headers(req.headers)?;

                (RequestHead { method, uri, version, headers }, body_offset)
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        src.advance(body_offset);
        trace!(head_size = body_offset, "parsed request head");

        let payload_size = request_payload(&head)?;
        Ok(Some((head, payload_size)))
    }
}

#[derive(Debug, Default)]
pub(crate) struct ResponseHeadDecoder;

impl Decoder for ResponseHeadDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut res = httparse::Response::new(&mut headers);

        let (head, body_offset) = match res.parse(src).map_err(map_httparse_error)? {
            Status::Complete(body_offset) => {
                ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let version = parse_version(res.version)?;
                let status = res
                    .code
                    .and_then(|code| StatusCode::from_u16(code).ok())
                    .ok_or(ParseError::InvalidStatus(res.code))?;
                let reason = res.reason.filter(|reason| !reason.is_empty()).map(str::to_string);
                let headers = copy_headers(res.headers)?;

                (ResponseHead { version, status, reason, headers }, body_offset)
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        src.advance(body_offset);
        trace!(head_size = body_offset, status = head.status.as_u16(), "parsed response head");

        let payload_size = response_payload(&head)?;
        Ok(Some((head, payload_size)))
    }
}

fn map_httparse_error(e: Error) -> ParseError {
    match e {
        Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
        Error::Version => ParseError::InvalidVersion(None),
        e => ParseError::invalid_header(e.to_string()),
    }
}

fn parse_version(version: Option<u8>) -> Result<Version, ParseError> {
    match version {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        // HTTP/2 and HTTP/3 are not spoken here
        v => Err(ParseError::InvalidVersion(v)),
    }
}

fn copy_headers(parsed: &[httparse::Header<'_>]) -> Result<Vec<Header>, ParseError> {
    parsed
        .iter()
        .map(|header| {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
            Ok((name, value))
        })
        .collect()
}

/// Requests with methods that carry no body are read as body-less regardless
/// of their headers.
fn request_payload(head: &RequestHead) -> Result<PayloadSize, ParseError> {
    if matches!(head.method, Method::GET | Method::HEAD | Method::DELETE | Method::OPTIONS | Method::CONNECT) {
        return Ok(PayloadSize::Empty);
    }
    payload_from_headers(&head.headers)
}

/// Informational, `204 No Content` and `304 Not Modified` responses never
/// carry a body.
fn response_payload(head: &ResponseHead) -> Result<PayloadSize, ParseError> {
    let status = head.status;
    if status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return Ok(PayloadSize::Empty);
    }
    payload_from_headers(&head.headers)
}

// refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding
fn payload_from_headers(headers: &[Header]) -> Result<PayloadSize, ParseError> {
    let te_header = find_header(headers, TRANSFER_ENCODING.as_str());
    let cl_header = find_header(headers, CONTENT_LENGTH.as_str());

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::Empty),

        (te_value @ Some(_), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::Chunked)
            } else {
                Ok(PayloadSize::Empty)
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(PayloadSize::Length(length))
        }

        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
        }
    }
}

/// Checks whether chunked is the final transfer coding, as RFC 9112 requires
/// for a chunked body.
pub(crate) fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    header_value
        .and_then(|value| value.as_bytes().rsplit(|b| *b == b',').next())
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(CHUNKED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn check_is_chunked() {
        assert!(!is_chunked(None));
        assert!(is_chunked(Some(&HeaderValue::from_static("chunked"))));
        assert!(is_chunked(Some(&HeaderValue::from_static("gzip, chunked"))));
        assert!(!is_chunked(Some(&HeaderValue::from_static("chunked, gzip"))));
        assert!(!is_chunked(Some(&HeaderValue::from_static("gzip"))));
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        123"##};

        let mut buf = BytesMut::from(str);

        let (head, payload_size) = RequestHeadDecoder.decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());
        assert_eq!(&buf[..], b"123");

        assert_eq!(head.method, Method::GET);
        assert_eq!(head.version, Version::HTTP_11);
        assert_eq!(head.uri.path(), "/index.html");
        assert_eq!(head.uri.query(), None);

        let names: Vec<&str> = head.headers.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["host", "user-agent", "accept"]);
        assert_eq!(find_header(&head.headers, "user-agent"), Some(&HeaderValue::from_static("curl/7.79.1")));
    }

    #[test]
    fn partial_head_consumes_nothing() {
        let mut buf = BytesMut::from("POST /upload HTTP/1.1\r\nHost: x\r\n");

        assert!(RequestHeadDecoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), "POST /upload HTTP/1.1\r\nHost: x\r\n".len());

        buf.extend_from_slice(b"Content-Length: 5\r\n\r\nhello");
        let (head, payload_size) = RequestHeadDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.method, Method::POST);
        assert_eq!(payload_size, PayloadSize::Length(5));
        assert_eq!(&buf[..], b"hello");
    }

    #[test]
    fn oversized_partial_head_is_rejected() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nX-Filler: ");
        buf.extend_from_slice(&[b'a'; MAX_HEADER_BYTES + 1024]);

        assert!(matches!(RequestHeadDecoder.decode(&mut buf), Err(ParseError::TooLargeHeader { .. })));
    }

    #[test]
    fn too_many_headers() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\n");
        for i in 0..=MAX_HEADER_NUM {
            buf.extend_from_slice(format!("X-{i}: v\r\n").as_bytes());
        }
        buf.extend_from_slice(b"\r\n");

        assert!(matches!(RequestHeadDecoder.decode(&mut buf), Err(ParseError::TooManyHeaders { .. })));
    }

    #[test]
    fn conflicting_body_headers() {
        let mut buf = BytesMut::from("POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 3\r\n\r\n");

        assert!(matches!(RequestHeadDecoder.decode(&mut buf), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn response_heads() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n");
        let (head, payload_size) = ResponseHeadDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(head.reason.as_deref(), Some("OK"));
        assert!(payload_size.is_chunked());
        assert!(buf.is_empty());

        let mut buf = BytesMut::from("HTTP/1.0 304 Not Modified\r\nContent-Length: 120\r\n\r\n");
        let (head, payload_size) = ResponseHeadDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(head.version, Version::HTTP_10);
        assert_eq!(payload_size, PayloadSize::Empty);

        let mut buf = BytesMut::from("HTTP/1.1 99 Odd\r\n\r\n");
        assert!(ResponseHeadDecoder.decode(&mut buf).is_err());
    }
}
