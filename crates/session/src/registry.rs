//! Ordered, lock-guarded collections of shared entries.
//!
//! Servers keep their sessions in a [`Registry`], and so do presentation
//! registries. Entries are keyed by their [`Handle`], which gives identity
//! semantics without scanning: two entries with equal contents are still
//! different entries. The registry lock is held for exactly one
//! insert/remove/lookup and never across an `.await`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::Handle;

/// Something that can live in a [`Registry`].
pub trait Registered: Send + Sync {
    /// The identity of this entry.
    fn handle(&self) -> Handle;

    /// Invoked once, after the entry has been taken out of its registry.
    fn on_removed(&self) {}
}

pub struct Registry<T: ?Sized> {
    entries: Mutex<BTreeMap<Handle, Arc<T>>>,
}

impl<T: Registered + ?Sized> Registry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { entries: Mutex::new(BTreeMap::new()) }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Handle, Arc<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `entry` under its handle.
    ///
    /// An entry already registered under the same handle is replaced.
    ///
    /// # Arguments
    ///
    /// * `entry` - The shared entry to register
    pub fn insert(&self, entry: Arc<T>) {
        let handle = entry.handle();
        self.lock().insert(handle, entry);
        trace!(%handle, "registered entry");
    }

    /// Removes the entry with the given handle.
    ///
    /// Removing a handle that is not (or no longer) registered does nothing.
    pub fn remove(&self, handle: Handle) -> Option<Arc<T>> {
        let removed = self.lock().remove(&handle);
        if let Some(entry) = &removed {
            entry.on_removed();
            trace!(%handle, "removed entry");
        }
        removed
    }

    /// Looks up an entry by handle.
    ///
    /// # Returns
    ///
    /// A new shared reference to the entry, or `None` if no entry with that
    /// handle is registered.
    pub fn get(&self, handle: Handle) -> Option<Arc<T>> {
        self.lock().get(&handle).cloned()
    }

    /// Returns true if an entry with this handle is registered.
    pub fn contains(&self, handle: Handle) -> bool {
        self.lock().contains_key(&handle)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the current entries in creation order.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.lock().values().cloned().collect()
    }

    /// Removes every entry, returning them in creation order.
    pub fn clear(&self) -> Vec<Arc<T>> {
        let drained = std::mem::take(&mut *self.lock());
        let entries: Vec<Arc<T>> = drained.into_values().collect();
        for entry in &entries {
            entry.on_removed();
        }
        entries
    }
}

impl<T: Registered + ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Registered + ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handles: Vec<Handle> = self.lock().keys().copied().collect();
        f.debug_struct("Registry").field("handles", &handles).finish()
    }
}
