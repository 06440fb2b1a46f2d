use std::io;

use micro_session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("session error: {source}")]
    Session {
        #[from]
        source: SessionError,
    },

    #[error("read error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("write error: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("presentation is closed")]
    Closed,
}

impl PresentationError {
    /// Returns true if the presentation or its session can no longer be used.
    pub fn is_closed(&self) -> bool {
        match self {
            PresentationError::Session { source } => source.is_closed(),
            PresentationError::Closed => true,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid http status: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("header {name} appended after the header block was closed")]
    HeaderAfterBody { name: String },

    #[error("unsupported http version: {version}")]
    UnsupportedVersion { version: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn header_after_body<S: ToString>(name: S) -> Self {
        Self::HeaderAfterBody { name: name.to_string() }
    }

    pub fn unsupported_version<S: ToString>(version: S) -> Self {
        Self::UnsupportedVersion { version: version.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
