//! The session contract and the servers that own sessions.
//!
//! A [`Session`] owns the read and write buffers of one byte-stream transport
//! and moves bytes between those buffers and the transport. It does not
//! interpret the bytes; that is the job of the presentation layer sitting on
//! top of it.
//!
//! # Locking
//!
//! The buffers live behind the session lock ([`Session::buffers`]). Code that
//! also holds a presentation lock must take the presentation lock first and
//! the session lock second.
//!
//! # Completion style
//!
//! Every operation exists twice:
//!
//! - awaited to completion: [`Session::read`], [`Session::read_some`],
//!   [`Session::write`]
//! - callback style: [`Session::async_read`], [`Session::async_write`], which
//!   spawn the work on the tokio runtime, return at once and invoke the
//!   callback exactly once with the outcome
//!
//! The callback style captures an `Arc` of the session, so the session stays
//! alive for as long as the completion may still run.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::{Registered, Registry, SessionError};

/// Single-shot completion callback for the callback style operations.
pub type Completion<T> = Box<dyn FnOnce(Result<T, SessionError>) + Send + 'static>;

/// The byte accumulators of a session.
///
/// `read` is appended to by the transport and consumed from the front by
/// the presentation layer. `write` is appended to by the presentation layer
/// and drained from the front by the transport.
#[derive(Debug, Default)]
pub struct Buffers {
    pub read: BytesMut,
    pub write: BytesMut,
}

/// A byte-stream transport together with its read and write buffers.
///
/// Sessions are shared as `Arc`s and every method takes `&self`, so one
/// session can be driven from several tasks at once.
#[async_trait]
pub trait Session: Registered + fmt::Debug + 'static {
    /// The session lock and the buffers it guards.
    fn buffers(&self) -> &Mutex<Buffers>;

    /// Returns true once the session has been removed from its server.
    fn is_closed(&self) -> bool;

    /// Waits for one readiness notification and performs one bounded drain
    /// of the transport into the read buffer.
    ///
    /// Returns the number of bytes appended, which is zero after a spurious
    /// wakeup.
    async fn read_some(&self) -> Result<usize, SessionError>;

    /// Transmits the whole write buffer.
    ///
    /// Bytes leave the buffer only once the transport accepted them, so on
    /// error whatever was not sent is still staged for the next call.
    async fn write(&self) -> Result<usize, SessionError>;

    /// Waits until at least one byte was appended to the read buffer.
    async fn read(&self) -> Result<usize, SessionError> {
        loop {
            let read_size = self.read_some().await?;
            if read_size > 0 {
                return Ok(read_size);
            }
            trace!(handle = %self.handle(), "spurious read readiness");
        }
    }

    /// Spawns [`Session::read_some`] and hands its outcome to `callback`.
    fn async_read(self: Arc<Self>, callback: Completion<usize>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let result = if self.is_closed() { Err(SessionError::Closed) } else { self.read_some().await };
            callback(result);
        })
    }

    /// Spawns [`Session::write`] and hands its outcome to `callback`.
    fn async_write(self: Arc<Self>, callback: Completion<usize>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let result = if self.is_closed() { Err(SessionError::Closed) } else { self.write().await };
            callback(result);
        })
    }
}

impl PartialEq for dyn Session {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl Eq for dyn Session {}

/// Owner of every session of one transport kind.
///
/// A session belongs to exactly one server for its whole life. Removing it
/// from the server closes it.
#[async_trait]
pub trait Server: Send + Sync {
    type Session: Session;

    fn sessions(&self) -> &Registry<Self::Session>;

    /// Starts accepting connections on the server's endpoint.
    async fn open(&self) -> Result<(), SessionError>;

    /// Connects to the server's endpoint and registers the client session.
    async fn connect(&self) -> Result<Arc<Self::Session>, SessionError>;

    /// Removes `session` from this server. Unknown sessions are ignored.
    fn close(&self, session: &Self::Session) {
        self.sessions().remove(session.handle());
    }
}
