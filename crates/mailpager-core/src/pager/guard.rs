//! Per-key load guard.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::CacheKey;

/// What an in-flight load is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// First load through mailbox selection.
    Open,
    /// Page-jump to the given page.
    Jump(u32),
    /// Scroll-growth of the visible feed.
    Grow,
}

type Table = Arc<Mutex<HashMap<CacheKey, LoadKind>>>;

/// Table of keys with an in-flight load.
///
/// Acquisition checks and marks the key under one lock, so two callers can
/// never both hold a lease for the same key.
#[derive(Debug, Clone, Default)]
pub struct LoadGuards {
    inflight: Table,
}

impl LoadGuards {
    /// Create an empty guard table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<CacheKey, LoadKind>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Try to mark `key` as loading.
    ///
    /// Returns `None` if a load for `key` is already in flight.
    #[must_use]
    pub fn try_acquire(&self, key: &CacheKey, kind: LoadKind) -> Option<LoadLease> {
        let mut table = self.table();
        if table.contains_key(key) {
            return None;
        }
        table.insert(key.clone(), kind);
        trace!(%key, ?kind, "Load guard acquired");
        Some(LoadLease {
            inflight: Arc::clone(&self.inflight),
            key: key.clone(),
            kind,
        })
    }

    /// The load currently in flight for `key`, if any.
    #[must_use]
    pub fn current(&self, key: &CacheKey) -> Option<LoadKind> {
        self.table().get(key).copied()
    }

    /// Returns true if `key` has a load in flight.
    #[must_use]
    pub fn is_held(&self, key: &CacheKey) -> bool {
        self.table().contains_key(key)
    }
}

/// Proof that the holder owns the single in-flight load for a key.
///
/// Dropping the lease releases the key on every exit path.
#[derive(Debug)]
#[must_use = "dropping the lease releases the load guard immediately"]
pub struct LoadLease {
    inflight: Table,
    key: CacheKey,
    kind: LoadKind,
}

impl LoadLease {
    /// Key this lease covers.
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Kind of load this lease was taken for.
    pub const fn kind(&self) -> LoadKind {
        self.kind
    }
}

impl Drop for LoadLease {
    fn drop(&mut self) {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        trace!(key = %self.key, kind = ?self.kind, "Load guard released");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(mailbox: &str) -> CacheKey {
        CacheKey::new("acct", mailbox).unwrap()
    }

    #[test]
    fn test_second_acquire_is_rejected() {
        let guards = LoadGuards::new();
        let inbox = key("INBOX");

        let lease = guards.try_acquire(&inbox, LoadKind::Jump(2)).unwrap();
        assert_eq!(lease.kind(), LoadKind::Jump(2));
        assert!(guards.try_acquire(&inbox, LoadKind::Grow).is_none());
        assert_eq!(guards.current(&inbox), Some(LoadKind::Jump(2)));

        drop(lease);
        assert!(!guards.is_held(&inbox));
        assert!(guards.try_acquire(&inbox, LoadKind::Grow).is_some());
    }

    #[test]
    fn test_keys_are_independent() {
        let guards = LoadGuards::new();
        let _inbox = guards.try_acquire(&key("INBOX"), LoadKind::Grow).unwrap();
        let sent = guards.try_acquire(&key("Sent"), LoadKind::Grow);
        assert!(sent.is_some());
    }

    #[test]
    fn test_release_on_panic_unwind() {
        let guards = LoadGuards::new();
        let inbox = key("INBOX");
        let cloned = guards.clone();
        let probe = inbox.clone();
        let result = std::panic::catch_unwind(move || {
            let _lease = cloned.try_acquire(&probe, LoadKind::Open).unwrap();
            panic!("load blew up");
        });
        assert!(result.is_err());
        assert!(!guards.is_held(&inbox));
    }
}
