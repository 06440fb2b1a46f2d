use std::io;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use bytes::Buf;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{Buffers, Handle, Registered, Registry, Session, SessionConfig, SessionError};

/// A session over a connected unix domain stream socket.
#[derive(Debug)]
pub struct UnixSession {
    handle: Handle,
    stream: UnixStream,
    buffers: Mutex<Buffers>,
    config: SessionConfig,
    closed: CancellationToken,
    owner: Weak<Registry<UnixSession>>,
}

impl UnixSession {
    /// Wraps `stream` in a session and registers it with `owner`.
    pub(crate) fn register(
        owner: &Arc<Registry<UnixSession>>,
        stream: UnixStream,
        config: SessionConfig,
        closed: CancellationToken,
    ) -> Arc<Self> {
        let session = Arc::new(Self {
            handle: Handle::next(),
            stream,
            buffers: Mutex::new(Buffers::default()),
            config,
            closed,
            owner: Arc::downgrade(owner),
        });
        owner.insert(Arc::clone(&session));
        debug!(handle = %session.handle, "unix session opened");
        session
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Removes this session from the server that owns it.
    pub fn close(&self) {
        match self.owner.upgrade() {
            Some(owner) => {
                owner.remove(self.handle);
            }
            None => self.on_removed(),
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed.is_cancelled() { Err(SessionError::Closed) } else { Ok(()) }
    }

    /// Waits for a readiness future unless the session gets closed first.
    async fn ready<F>(&self, readiness: F) -> Result<(), SessionError>
    where
        F: Future<Output = io::Result<()>>,
    {
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(SessionError::Closed),
            ready = readiness => ready.map_err(SessionError::io),
        }
    }

    /// One bounded pass of non-blocking reads into the read buffer.
    async fn drain(&self) -> Result<usize, SessionError> {
        let mut page = vec![0u8; self.config.page_size()];
        let mut read_size = 0;

        for _ in 0..self.config.max_drain_pages() {
            match self.stream.try_read(&mut page) {
                Ok(0) => {
                    debug!(handle = %self.handle, "peer closed the connection");
                    if read_size == 0 {
                        return Err(SessionError::ConnectionClosed);
                    }
                    break;
                }
                Ok(n) => {
                    self.buffers.lock().await.read.extend_from_slice(&page[..n]);
                    read_size += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(handle = %self.handle, cause = %e, "read from unix socket failed");
                    return Err(e.into());
                }
            }
        }

        trace!(handle = %self.handle, read_size, "drained unix socket");
        Ok(read_size)
    }
}

impl Registered for UnixSession {
    fn handle(&self) -> Handle {
        self.handle
    }

    fn on_removed(&self) {
        if !self.closed.is_cancelled() {
            debug!(handle = %self.handle, "unix session closed");
        }
        self.closed.cancel();
    }
}

#[async_trait]
impl Session for UnixSession {
    fn buffers(&self) -> &Mutex<Buffers> {
        &self.buffers
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    async fn read_some(&self) -> Result<usize, SessionError> {
        self.ensure_open()?;
        self.ready(self.stream.readable()).await?;
        self.drain().await
    }

    async fn write(&self) -> Result<usize, SessionError> {
        self.ensure_open()?;

        let mut buffers = self.buffers.lock().await;
        let page_size = self.config.page_size();
        let mut write_size = 0;

        while !buffers.write.is_empty() {
            let mut page_remaining = buffers.write.len().min(page_size);
            while page_remaining > 0 {
                self.ready(self.stream.writable()).await?;
                match self.stream.try_write(&buffers.write[..page_remaining]) {
                    Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                    Ok(n) => {
                        buffers.write.advance(n);
                        page_remaining -= n;
                        write_size += n;
                    }
                    Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {}
                    Err(e) => {
                        warn!(handle = %self.handle, cause = %e, "write to unix socket failed");
                        return Err(e.into());
                    }
                }
            }
        }

        trace!(handle = %self.handle, write_size, "flushed unix socket");
        Ok(write_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Server;
    use crate::unix::UnixServer;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn server_with(config: SessionConfig) -> UnixServer {
        UnixServer::builder().config(config).build()
    }

    #[tokio::test]
    async fn reads_accumulate_in_arrival_order() {
        let server = server_with(SessionConfig::default());
        let (session, mut peer) = {
            let (ours, theirs) = UnixStream::pair().unwrap();
            (server.adopt(ours), theirs)
        };

        for part in [&b"A"[..], b"BB", b"CCC"] {
            peer.write_all(part).await.unwrap();
            session.read().await.unwrap();
        }

        assert_eq!(&session.buffers().lock().await.read[..], b"ABBCCC");
    }

    #[tokio::test]
    async fn write_drains_in_pages() {
        let config = SessionConfig::builder().page_size(3).build();
        let server = server_with(config);
        let (ours, mut theirs) = UnixStream::pair().unwrap();
        let session = server.adopt(ours);

        session.buffers().lock().await.write.extend_from_slice(b"0123456789");
        let write_size = session.write().await.unwrap();

        assert_eq!(write_size, 10);
        assert!(session.buffers().lock().await.write.is_empty());

        let mut received = [0u8; 10];
        theirs.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"0123456789");
    }

    #[tokio::test]
    async fn bounded_drain_leaves_rest_for_next_notification() {
        let config = SessionConfig::builder().page_size(4).max_drain_pages(2).build();
        let server = server_with(config);
        let (ours, mut theirs) = UnixStream::pair().unwrap();
        let session = server.adopt(ours);

        theirs.write_all(b"0123456789ab").await.unwrap();

        assert_eq!(session.read_some().await.unwrap(), 8);
        assert_eq!(session.read().await.unwrap(), 4);
        assert_eq!(&session.buffers().lock().await.read[..], b"0123456789ab");
    }

    #[tokio::test]
    async fn peer_eof_is_connection_closed() {
        let server = server_with(SessionConfig::default());
        let (ours, theirs) = UnixStream::pair().unwrap();
        let session = server.adopt(ours);
        drop(theirs);

        let result = session.read().await;
        assert!(matches!(result, Err(SessionError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn closing_wakes_pending_read() {
        let server = server_with(SessionConfig::default());
        let (ours, _theirs) = UnixStream::pair().unwrap();
        let session = server.adopt(ours);

        let pending = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.read().await })
        };
        tokio::task::yield_now().await;
        server.close(&session);

        assert!(matches!(pending.await.unwrap(), Err(SessionError::Closed)));
        assert!(server.sessions().is_empty());
        assert!(matches!(session.write().await, Err(SessionError::Closed)));
    }

    #[tokio::test]
    async fn close_through_session_detaches_from_server() {
        let server = server_with(SessionConfig::default());
        let (ours, _theirs) = UnixStream::pair().unwrap();
        let session = server.adopt(ours);

        session.close();
        session.close();

        assert!(session.is_closed());
        assert!(server.sessions().is_empty());
    }
}
