use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::unix::UnixSession;
use crate::{Registry, Server, SessionConfig, SessionError};

/// Builder for [`UnixServer`].
#[derive(Debug, Default)]
pub struct UnixServerBuilder {
    path: Option<PathBuf>,
    config: Option<SessionConfig>,
}

impl UnixServerBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// The socket path to bind in [`Server::open`] and to dial in [`Server::connect`].
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// The configuration handed to every session of the server.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> UnixServer {
        UnixServer {
            path: self.path,
            config: self.config.unwrap_or_default(),
            sessions: Arc::new(Registry::new()),
            listener: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Owner of the [`UnixSession`]s of one socket path.
///
/// A server without a path can still own sessions created by
/// [`UnixServer::adopt`] or [`UnixServer::pair`].
#[derive(Debug)]
pub struct UnixServer {
    path: Option<PathBuf>,
    config: SessionConfig,
    sessions: Arc<Registry<UnixSession>>,
    listener: Mutex<Option<Arc<UnixListener>>>,
    shutdown: CancellationToken,
}

impl UnixServer {
    /// Creates a builder for a server without a path and with default configuration.
    pub fn builder() -> UnixServerBuilder {
        UnixServerBuilder::new()
    }

    /// The socket path, if the server was built with one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The configuration of the sessions this server creates.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true between a successful [`Server::open`] and [`UnixServer::shutdown`].
    pub fn is_listening(&self) -> bool {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Registers an already connected stream as a session of this server.
    pub fn adopt(&self, stream: UnixStream) -> Arc<UnixSession> {
        UnixSession::register(&self.sessions, stream, self.config, self.shutdown.child_token())
    }

    /// Creates two connected sessions, both owned by this server.
    pub fn pair(&self) -> Result<(Arc<UnixSession>, Arc<UnixSession>), SessionError> {
        let (left, right) = UnixStream::pair()?;
        Ok((self.adopt(left), self.adopt(right)))
    }

    /// Waits for one incoming connection.
    pub async fn accept_one(&self) -> Result<Arc<UnixSession>, SessionError> {
        let listener = self.current_listener()?;
        let (stream, _addr) = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => return Err(SessionError::Closed),
            accepted = listener.accept() => accepted?,
        };
        Ok(self.adopt(stream))
    }

    /// Spawns an accept loop calling `callback` once per accepted connection.
    ///
    /// Accept failures are logged and reported to `callback`; the loop keeps
    /// accepting until the server shuts down.
    pub fn accept<F>(&self, callback: F) -> Result<JoinHandle<()>, SessionError>
    where
        F: Fn(Result<Arc<UnixSession>, SessionError>) + Send + Sync + 'static,
    {
        let listener = self.current_listener()?;
        let sessions = Arc::clone(&self.sessions);
        let config = self.config;
        let shutdown = self.shutdown.clone();

        Ok(tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    accepted = listener.accept() => accepted,
                };

                match accepted {
                    Ok((stream, _addr)) => {
                        let session = UnixSession::register(&sessions, stream, config, shutdown.child_token());
                        callback(Ok(session));
                    }
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        callback(Err(e.into()));
                    }
                }
            }
            debug!("accept loop stopped");
        }))
    }

    /// Stops accepting, closes every session and unlinks the socket file.
    ///
    /// Calling it again does nothing.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let closed = self.sessions.clear();

        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        if listener.is_some() {
            if let Some(path) = &self.path {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), cause = %e, "failed to remove socket file");
                }
            }
            info!(sessions = closed.len(), "unix server shut down");
        }
    }

    fn endpoint(&self) -> Result<&Path, SessionError> {
        self.path.as_deref().ok_or(SessionError::NotListening)
    }

    fn current_listener(&self) -> Result<Arc<UnixListener>, SessionError> {
        if self.shutdown.is_cancelled() {
            return Err(SessionError::Closed);
        }
        self.listener.lock().unwrap_or_else(PoisonError::into_inner).clone().ok_or(SessionError::NotListening)
    }

    fn bind(&self) -> Result<(), SessionError> {
        let path = self.endpoint()?;
        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if listener.is_some() {
            return Err(SessionError::already_listening(path.display()));
        }

        // a socket file left behind by a previous process blocks bind
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed stale socket file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        *listener = Some(Arc::new(UnixListener::bind(path)?));
        info!(path = %path.display(), "unix server listening");
        Ok(())
    }
}

#[async_trait]
impl Server for UnixServer {
    type Session = UnixSession;

    fn sessions(&self) -> &Registry<UnixSession> {
        &self.sessions
    }

    async fn open(&self) -> Result<(), SessionError> {
        if self.shutdown.is_cancelled() {
            return Err(SessionError::Closed);
        }
        self.bind()
    }

    async fn connect(&self) -> Result<Arc<UnixSession>, SessionError> {
        let stream = UnixStream::connect(self.endpoint()?).await?;
        Ok(self.adopt(stream))
    }
}

impl Drop for UnixServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
