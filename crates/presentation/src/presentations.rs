use std::fmt;
use std::sync::Arc;

use micro_session::{Handle, Registered, Registry, Server, Session};
use tracing::debug;

use crate::error::PresentationError;
use crate::{Codec, Presentation};

/// Owner of the presentations of one codec.
///
/// Works like a server's session registry: presentations are created into it
/// and closed by removing them, which is idempotent.
pub struct Presentations<C: Codec> {
    registry: Registry<Presentation<C>>,
}

impl<C: Codec> Presentations<C> {
    /// Creates an empty registry of presentations.
    pub fn new() -> Self {
        Self { registry: Registry::new() }
    }

    /// Binds a new presentation to `session`.
    pub fn create(&self, session: Arc<dyn Session>) -> Arc<Presentation<C>> {
        let presentation = Arc::new(Presentation::new(session));
        self.registry.insert(Arc::clone(&presentation));
        debug!(handle = %presentation.handle(), session = %presentation.session().handle(), "presentation created");
        presentation
    }

    /// Opens a client session on `server` and binds a new presentation to it.
    pub async fn connect<S: Server>(&self, server: &S) -> Result<Arc<Presentation<C>>, PresentationError> {
        let session: Arc<dyn Session> = server.connect().await?;
        Ok(self.create(session))
    }

    /// Removes `presentation` and marks it closed. The session stays open.
    ///
    /// Closing a presentation that is not registered here does nothing.
    pub fn close(&self, presentation: &Presentation<C>) {
        self.registry.remove(presentation.handle());
    }

    /// Looks up a presentation by handle.
    ///
    /// # Returns
    ///
    /// The presentation, or `None` once it has been closed or if it never
    /// belonged to this registry.
    pub fn get(&self, handle: Handle) -> Option<Arc<Presentation<C>>> {
        self.registry.get(handle)
    }

    /// Number of open presentations.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// The registered presentations in creation order.
    pub fn snapshot(&self) -> Vec<Arc<Presentation<C>>> {
        self.registry.snapshot()
    }
}

impl<C: Codec> Default for Presentations<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> fmt::Debug for Presentations<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presentations").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::http1::{HttpPresentations, HttpReqRes};
    use micro_session::unix::UnixServer;
    use micro_session::{Registered, Session};
    use std::sync::Arc;

    #[tokio::test]
    async fn presentations_are_distinct_even_on_one_session() {
        let server = UnixServer::builder().build();
        let (left, _right) = server.pair().unwrap();
        let presentations = HttpPresentations::new();

        let a = presentations.create(Arc::clone(&left) as Arc<dyn Session>);
        let b = presentations.create(left);

        assert!(*a == *a);
        assert!(*a != *b);
        assert_eq!(a.get().await.0.headers().len(), b.get().await.0.headers().len());
        let handles: Vec<_> = presentations.snapshot().iter().map(|p| p.handle()).collect();
        assert_eq!(handles, vec![a.handle(), b.handle()]);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let server = UnixServer::builder().build();
        let (left, _right) = server.pair().unwrap();
        let presentations = HttpPresentations::default();
        let presentation = presentations.create(left);
        let handle = presentation.handle();

        presentations.close(&presentation);
        presentations.close(&presentation);

        assert!(presentations.is_empty());
        assert!(presentations.get(handle).is_none());
        assert!(presentation.is_closed());
        assert!(!presentation.session().is_closed());
        assert!(presentation.read().await.unwrap_err().is_closed());
        presentation.set(HttpReqRes::default()).await;
    }
}
