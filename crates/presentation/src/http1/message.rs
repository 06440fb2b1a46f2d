//! HTTP request and response values.
//!
//! [`HttpRequest`] and [`HttpResponse`] are the structured values an HTTP
//! presentation exchanges with the application. Besides the start line they
//! carry an ordered list of headers and an ordered list of body chunks, each
//! with a cursor pointing at the first element not yet written to a session.
//!
//! The lists are append-only. A write serializes everything from the cursors
//! onwards and then moves the cursors to the end, so an application can stream
//! a message: write the headers, push chunks as they are produced, write
//! again, and finally [`finish`](HttpResponse::finish) the body.
//!
//! ```
//! use bytes::Bytes;
//! use http::header::{HeaderValue, TRANSFER_ENCODING};
//! use http::StatusCode;
//! use micro_presentation::http1::HttpResponse;
//!
//! let mut response = HttpResponse::new(StatusCode::OK);
//! response.push_header(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
//! response.push_chunk(Bytes::from_static(b"hello"));
//! response.finish();
//!
//! assert_eq!(response.next_header(), 0);
//! assert_eq!(response.chunks().len(), 1);
//! ```

use std::io;
use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri, Version};

use crate::error::{ParseError, SendError};
use crate::http1::codec::{
    PayloadDecoder, PayloadSize, RequestHead, RequestHeadDecoder, ResponseHead, ResponseHeadDecoder,
};
use tokio_util::codec::Decoder;

/// One header field.
pub type Header = (HeaderName, HeaderValue);

/// Write and read progress shared by requests and responses.
#[derive(Debug, Clone, Default)]
pub(crate) struct MessageState {
    pub(crate) headers: Vec<Header>,
    pub(crate) next_header: usize,
    pub(crate) chunks: Vec<Bytes>,
    pub(crate) next_chunk: usize,
    /// the blank line ending the header block has been emitted or consumed
    pub(crate) header_block_closed: bool,
    /// no chunk will follow the ones already in `chunks`
    pub(crate) finished: bool,
    /// the end of the body has been emitted or consumed
    pub(crate) end_sent: bool,
    pub(crate) payload_decoder: Option<PayloadDecoder>,
}

impl MessageState {
    fn header(&self, name: &str) -> Option<&HeaderValue> {
        find_header(&self.headers, name)
    }

    fn body(&self) -> Bytes {
        match self.chunks.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            chunks => {
                let mut body = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
                for chunk in chunks {
                    body.put_slice(chunk);
                }
                body.freeze()
            }
        }
    }

    /// Records a head consumed from the wire: nothing of it is left to write.
    fn consume_head(&mut self, headers: Vec<Header>, payload_size: PayloadSize) {
        self.headers = headers;
        self.next_header = self.headers.len();
        self.chunks.clear();
        self.next_chunk = 0;
        self.header_block_closed = true;
        self.finished = false;
        self.end_sent = false;
        self.payload_decoder = Some(payload_size.into());
    }
}

/// Returns the last header named `name`, compared case-insensitively.
pub(crate) fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a HeaderValue> {
    headers
        .iter()
        .rev()
        .find(|(header_name, _)| header_name.as_str().eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// A message the codec can write from its cursors and read into.
pub(crate) trait HttpMessage {
    type Head;
    type HeadDecoder: Decoder<Item = (Self::Head, PayloadSize), Error = ParseError> + Default;

    fn state(&self) -> &MessageState;

    fn state_mut(&mut self) -> &mut MessageState;

    fn start_line_done(&self) -> bool;

    fn set_start_line_done(&mut self);

    fn encode_start_line(&self, dst: &mut BytesMut) -> Result<(), SendError>;

    fn apply_head(&mut self, head: Self::Head, payload_size: PayloadSize);
}

macro_rules! message_accessors {
    ($message:ty) => {
        impl $message {
            /// The headers in the order they were added or received.
            pub fn headers(&self) -> &[Header] {
                &self.state.headers
            }

            /// Returns the value of the last header called `name`, ignoring ASCII case.
            pub fn header(&self, name: &str) -> Option<&HeaderValue> {
                self.state.header(name)
            }

            /// Appends a header. Headers are written in the order they are pushed.
            pub fn push_header(&mut self, name: HeaderName, value: HeaderValue) {
                self.state.headers.push((name, value));
            }

            /// Index of the first header not yet written.
            pub fn next_header(&self) -> usize {
                self.state.next_header
            }

            pub fn chunks(&self) -> &[Bytes] {
                &self.state.chunks
            }

            /// Appends a body chunk.
            pub fn push_chunk<B: Into<Bytes>>(&mut self, chunk: B) {
                self.state.chunks.push(chunk.into());
            }

            /// Index of the first chunk not yet written.
            pub fn next_chunk(&self) -> usize {
                self.state.next_chunk
            }

            /// All chunks joined into one buffer.
            pub fn body(&self) -> Bytes {
                self.state.body()
            }

            /// Marks the body as complete; the next write closes the message.
            pub fn finish(&mut self) {
                self.state.finished = true;
            }

            /// Returns true once the body is complete, either because
            /// [`finish`](Self::finish) was called or because the end of the
            /// body was read from the session.
            pub fn is_finished(&self) -> bool {
                self.state.finished
            }

            /// Returns true once every part of the message has been written, or
            /// read in full.
            pub fn is_complete(&self) -> bool {
                self.state.end_sent
                    && self.state.next_header == self.state.headers.len()
                    && self.state.next_chunk == self.state.chunks.len()
            }
        }
    };
}

/// An HTTP request.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    method: Method,
    uri: Uri,
    version: Version,
    http_request_line_complete: bool,
    state: MessageState,
}

message_accessors!(HttpRequest);

impl HttpRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri, ..Self::default() }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// The `Host` header, if present and valid UTF-8.
    pub fn host(&self) -> Option<&str> {
        self.header(http::header::HOST.as_str()).and_then(|value| value.to_str().ok())
    }

    /// True once the request line has been written or read.
    pub fn http_request_line_complete(&self) -> bool {
        self.http_request_line_complete
    }
}

impl HttpMessage for HttpRequest {
    type Head = RequestHead;
    type HeadDecoder = RequestHeadDecoder;

    fn state(&self) -> &MessageState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut MessageState {
        &mut self.state
    }

    fn start_line_done(&self) -> bool {
        self.http_request_line_complete
    }

    fn set_start_line_done(&mut self) {
        self.http_request_line_complete = true;
    }

    fn encode_start_line(&self, dst: &mut BytesMut) -> Result<(), SendError> {
        let version = version_str(self.version)?;
        write!(FastWrite(dst), "{} {} {}\r\n", self.method, self.uri, version)?;
        Ok(())
    }

    fn apply_head(&mut self, head: RequestHead, payload_size: PayloadSize) {
        self.method = head.method;
        self.uri = head.uri;
        self.version = head.version;
        self.http_request_line_complete = true;
        self.state.consume_head(head.headers, payload_size);
    }
}

/// An HTTP response.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    version: Version,
    status: StatusCode,
    reason: Option<String>,
    status_line_finished: bool,
    state: MessageState,
}

message_accessors!(HttpResponse);

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status, ..Self::default() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The reason phrase: the one received or set, else the canonical one.
    pub fn reason(&self) -> &str {
        self.reason.as_deref().or_else(|| self.status.canonical_reason()).unwrap_or("")
    }

    pub fn set_reason<S: Into<String>>(&mut self, reason: S) {
        self.reason = Some(reason.into());
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// True once the status line has been written or read.
    pub fn status_line_finished(&self) -> bool {
        self.status_line_finished
    }
}

impl HttpMessage for HttpResponse {
    type Head = ResponseHead;
    type HeadDecoder = ResponseHeadDecoder;

    fn state(&self) -> &MessageState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut MessageState {
        &mut self.state
    }

    fn start_line_done(&self) -> bool {
        self.status_line_finished
    }

    fn set_start_line_done(&mut self) {
        self.status_line_finished = true;
    }

    fn encode_start_line(&self, dst: &mut BytesMut) -> Result<(), SendError> {
        let version = version_str(self.version)?;
        write!(FastWrite(dst), "{} {} {}\r\n", version, self.status.as_str(), self.reason())?;
        Ok(())
    }

    fn apply_head(&mut self, head: ResponseHead, payload_size: PayloadSize) {
        self.version = head.version;
        self.status = head.status;
        self.reason = head.reason;
        self.status_line_finished = true;
        self.state.consume_head(head.headers, payload_size);
    }
}

fn version_str(version: Version) -> Result<&'static str, SendError> {
    match version {
        Version::HTTP_10 => Ok("HTTP/1.0"),
        Version::HTTP_11 => Ok("HTTP/1.1"),
        v => Err(SendError::unsupported_version(format!("{v:?}"))),
    }
}

/// `io::Write` adapter over `BytesMut`, so `write!` can format into it.
pub(crate) struct FastWrite<'a>(pub(crate) &'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
