use std::io;
use thiserror::Error;

/// Errors reported by sessions and servers.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("session is closed")]
    Closed,

    #[error("server is not listening")]
    NotListening,

    #[error("server is already listening on {path}")]
    AlreadyListening { path: String },
}

impl SessionError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn already_listening<S: ToString>(path: S) -> Self {
        Self::AlreadyListening { path: path.to_string() }
    }

    /// Returns true if the error means the session can no longer carry bytes,
    /// either because the peer went away or because it was closed locally.
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionError::ConnectionClosed | SessionError::Closed)
    }
}
