use bytes::Bytes;

/// One step of a decoded message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PayloadItem {
    /// A chunk of body data
    Chunk(Bytes),
    /// Marks the end of the body
    Eof,
}

/// How the body of a message is delimited on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum PayloadSize {
    /// Exactly this many bytes, from `Content-Length`
    Length(u64),
    /// Chunked transfer encoding
    Chunked,
    /// No body
    Empty,
}

impl PayloadSize {
    #[inline]
    pub(crate) fn is_chunked(self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub(crate) fn is_empty(self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}
