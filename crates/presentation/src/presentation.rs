//! The generic presentation layer.
//!
//! A [`Presentation`] binds one [`Session`] to a tuple of structured values
//! and converts between the two with a [`Codec`]. The codec only decides how
//! bytes map to values; locking, the session I/O and the completion style are
//! handled here once for every codec.
//!
//! # Locking
//!
//! The values live behind the presentation lock. Conversions take the
//! presentation lock first and the session lock second, and release the
//! session lock before flushing, so the transport write never blocks other
//! users of the session buffers longer than the conversion itself.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::BytesMut;
use micro_session::{Handle, Registered, Session};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{ParseError, PresentationError, SendError};

/// Maps the bytes of a session to and from a tuple of values.
///
/// Both directions are resumable. `decode` consumes the prefix of `src` it
/// could turn into values and leaves the rest, which may be an incomplete
/// message. `encode` appends whatever of the values has not been written yet.
pub trait Codec: Send + Sync + 'static {
    type Values: Clone + Default + fmt::Debug + Send + 'static;

    fn decode(values: &mut Self::Values, src: &mut BytesMut) -> Result<(), ParseError>;

    fn encode(values: &mut Self::Values, dst: &mut BytesMut) -> Result<(), SendError>;
}

/// One session bound to a tuple of values through the codec `C`.
///
/// Values are only touched under the presentation lock, so [`get`](Self::get)
/// always observes a whole tuple and never one half-way through a conversion.
pub struct Presentation<C: Codec> {
    handle: Handle,
    values: Mutex<C::Values>,
    session: Arc<dyn Session>,
    closed: AtomicBool,
    codec: PhantomData<fn() -> C>,
}

impl<C: Codec> Presentation<C> {
    /// Creates an unregistered presentation over `session` with default values.
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            handle: Handle::next(),
            values: Mutex::new(C::Values::default()),
            session,
            closed: AtomicBool::new(false),
            codec: PhantomData,
        }
    }

    /// The session this presentation reads from and writes to.
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Returns true once the presentation or its session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.session.is_closed()
    }

    fn ensure_open(&self) -> Result<(), PresentationError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PresentationError::Closed);
        }
        Ok(())
    }

    /// A consistent copy of the whole value tuple.
    pub async fn get(&self) -> C::Values {
        self.values.lock().await.clone()
    }

    /// Replaces the whole value tuple.
    pub async fn set(&self, values: C::Values) {
        *self.values.lock().await = values;
    }

    /// Runs `f` on the value tuple under the presentation lock.
    pub async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut C::Values) -> R,
    {
        f(&mut *self.values.lock().await)
    }

    /// Converts the bytes already in the session's read buffer into values.
    ///
    /// No transport I/O happens here; pair it with [`Session::read`] or use
    /// [`Presentation::async_read`].
    pub async fn read(&self) -> Result<(), PresentationError> {
        self.ensure_open()?;
        let mut values = self.values.lock().await;
        let mut buffers = self.session.buffers().lock().await;

        let before = buffers.read.len();
        C::decode(&mut values, &mut buffers.read)?;
        trace!(handle = %self.handle, consumed = before - buffers.read.len(), "decoded values");
        Ok(())
    }

    /// Stages the unwritten part of the values in the session's write buffer
    /// and flushes the buffer to the transport.
    ///
    /// Staging is one locked step; once it succeeds the codec state has moved
    /// on, so a failed flush is retried by calling `write` again, which only
    /// re-sends what is still staged.
    ///
    /// # Returns
    ///
    /// The number of bytes the transport accepted during the flush, which
    /// includes bytes staged by earlier failed calls.
    ///
    /// # Errors
    ///
    /// - [`PresentationError::Closed`] once the presentation was closed
    /// - [`PresentationError::Send`] if the values can not be encoded
    /// - [`PresentationError::Session`] if the flush fails
    pub async fn write(&self) -> Result<usize, PresentationError> {
        self.ensure_open()?;
        let mut values = self.values.lock().await;
        {
            let mut buffers = self.session.buffers().lock().await;
            let before = buffers.write.len();
            C::encode(&mut values, &mut buffers.write)?;
            trace!(handle = %self.handle, staged = buffers.write.len() - before, "encoded values");
        }

        let sent = self.session.write().await?;
        Ok(sent)
    }

    async fn receive(&self) -> Result<usize, PresentationError> {
        self.ensure_open()?;
        let read_size = self.session.read_some().await?;
        self.read().await?;
        Ok(read_size)
    }

    /// Spawns one transport read followed by [`Presentation::read`], then
    /// calls `callback` with the number of bytes the transport delivered.
    ///
    /// The task owns `self`; closing the presentation before the read
    /// completes makes the callback see [`PresentationError::Closed`].
    pub fn async_read<F>(self: Arc<Self>, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<usize, PresentationError>) + Send + 'static,
    {
        tokio::spawn(async move {
            let result = self.receive().await;
            callback(result);
        })
    }

    /// Spawns [`Presentation::write`] and calls `callback` with its outcome.
    pub fn async_write<F>(self: Arc<Self>, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<usize, PresentationError>) + Send + 'static,
    {
        tokio::spawn(async move {
            let result = self.write().await;
            callback(result);
        })
    }
}

impl<C: Codec> Registered for Presentation<C> {
    fn handle(&self) -> Handle {
        self.handle
    }

    fn on_removed(&self) {
        self.closed.store(true, Ordering::Release);
        debug!(handle = %self.handle, session = %self.session.handle(), "presentation closed");
    }
}

impl<C: Codec> PartialEq for Presentation<C> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<C: Codec> Eq for Presentation<C> {}

impl<C: Codec> fmt::Debug for Presentation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presentation")
            .field("handle", &self.handle)
            .field("session", &self.session.handle())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
