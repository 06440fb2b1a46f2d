//! Stable identities for sessions and presentations.
//!
//! Every session and presentation is stamped with a [`Handle`] when it is
//! created. Handles come from one process-wide counter, so they are unique,
//! never reused, and ordered by creation time. Registries key their entries by
//! handle, which keeps lookup and removal independent of how the entries
//! themselves compare.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// A monotonically assigned identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Allocates the next unused handle.
    pub fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
