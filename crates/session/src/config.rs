//! Tuning knobs for transport sessions.
//!
//! The defaults match what the local-socket transport needs out of the box: a
//! 4 KiB page for every non-blocking read or write call, and at most 16 pages
//! drained per readiness notification so one busy peer cannot starve the rest
//! of the runtime.

/// Default number of bytes moved by a single non-blocking read or write.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Default number of pages drained per readiness notification.
pub const DEFAULT_MAX_DRAIN_PAGES: usize = 16;

/// Per-session I/O tuning, see [`SessionConfig::builder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    page_size: usize,
    max_drain_pages: usize,
}

impl SessionConfig {
    /// Creates a builder starting from the defaults.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Bytes moved by one non-blocking read or write call.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages read at most per readiness notification.
    #[inline]
    pub fn max_drain_pages(&self) -> usize {
        self.max_drain_pages
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, max_drain_pages: DEFAULT_MAX_DRAIN_PAGES }
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    page_size: Option<usize>,
    max_drain_pages: Option<usize>,
}

impl SessionConfigBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Sets the page size, zero is bumped to one byte.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Sets how many pages one readiness notification may drain, zero is bumped to one.
    pub fn max_drain_pages(mut self, max_drain_pages: usize) -> Self {
        self.max_drain_pages = Some(max_drain_pages.max(1));
        self
    }

    pub fn build(self) -> SessionConfig {
        SessionConfig {
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            max_drain_pages: self.max_drain_pages.unwrap_or(DEFAULT_MAX_DRAIN_PAGES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = SessionConfig::builder().build();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.max_drain_pages(), DEFAULT_MAX_DRAIN_PAGES);
    }

    #[test]
    fn builder_rejects_zero() {
        let config = SessionConfig::builder().page_size(0).max_drain_pages(0).build();
        assert_eq!(config.page_size(), 1);
        assert_eq!(config.max_drain_pages(), 1);
    }
}
