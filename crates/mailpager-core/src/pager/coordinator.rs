//! Page-jump and scroll-growth loads against the header cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::guard::{LoadGuards, LoadKind, LoadLease};
use super::status::ErrorNotice;
use crate::cache::{HeaderCache, MailboxCacheEntry, Uid};
use crate::config::PagerConfig;
use crate::gateway::{GatewayError, MailGateway};
use crate::CacheKey;

/// Why a request was turned into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No account or mailbox is active.
    NoKey,
    /// Another load for the same key is in flight.
    Busy,
    /// Page outside `1..=total_pages`.
    OutOfRange,
    /// The requested page is already shown.
    AlreadyVisible,
    /// The feed has no more pages.
    Exhausted,
    /// The key has not been loaded yet.
    NotLoaded,
}

/// Result of a load request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The load completed and the cache was updated.
    Applied {
        /// Records committed (page loads) or newly added (growth).
        count: usize,
    },
    /// The request was ignored.
    Rejected(Rejection),
    /// The gateway failed; the error is also stored for the key.
    Failed(ErrorNotice),
}

impl LoadOutcome {
    /// Returns true if the cache was updated.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Coordinates loads for every mailbox key.
///
/// At most one load per key is in flight; a second request for the same key
/// is rejected with [`Rejection::Busy`] rather than queued. Gateway errors are
/// classified and stored per key and never propagated to the caller.
#[derive(Debug)]
pub struct Pager<G> {
    gateway: Arc<G>,
    cache: Arc<HeaderCache>,
    guards: LoadGuards,
    errors: Mutex<HashMap<CacheKey, ErrorNotice>>,
    config: PagerConfig,
}

impl<G: MailGateway> Pager<G> {
    /// Create a coordinator over `cache`, fetching from `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<G>, cache: Arc<HeaderCache>, config: PagerConfig) -> Self {
        Self {
            gateway,
            cache,
            guards: LoadGuards::new(),
            errors: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// The shared header cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<HeaderCache> {
        &self.cache
    }

    /// The gateway loads are fetched from.
    #[must_use]
    pub const fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PagerConfig {
        &self.config
    }

    const fn page_size(&self) -> u32 {
        self.config.page_size
    }

    fn errors(&self) -> MutexGuard<'_, HashMap<CacheKey, ErrorNotice>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the cached entry for `key`.
    #[must_use]
    pub fn entry(&self, key: &CacheKey) -> Option<MailboxCacheEntry> {
        self.cache.get(key)
    }

    /// Returns true if a load for `key` is in flight.
    #[must_use]
    pub fn is_loading(&self, key: &CacheKey) -> bool {
        self.guards.is_held(key)
    }

    /// Page being jumped to, while the jump is in flight.
    #[must_use]
    pub fn pending_page(&self, key: &CacheKey) -> Option<u32> {
        match self.guards.current(key) {
            Some(LoadKind::Jump(page)) => Some(page),
            _ => None,
        }
    }

    /// Error from the last failed operation on `key`.
    #[must_use]
    pub fn last_error(&self, key: &CacheKey) -> Option<ErrorNotice> {
        self.errors().get(key).cloned()
    }

    /// Forget the stored error for `key`.
    pub fn dismiss_error(&self, key: &CacheKey) {
        self.errors().remove(key);
    }

    fn record_error(&self, key: &CacheKey, error: &GatewayError) -> ErrorNotice {
        let notice = ErrorNotice::from(error);
        warn!(%key, kind = ?notice.kind, error = %error, "Gateway call failed");
        self.errors().insert(key.clone(), notice.clone());
        notice
    }

    /// Select the mailbox and commit its first page.
    pub async fn open(&self, key: &CacheKey) -> LoadOutcome {
        let Some(lease) = self.guards.try_acquire(key, LoadKind::Open) else {
            debug!(%key, "Open rejected, load in flight");
            return LoadOutcome::Rejected(Rejection::Busy);
        };
        self.load_first(lease).await
    }

    /// Drop the cached entry for `key` and load it again from page 1.
    pub async fn refresh(&self, key: &CacheKey) -> LoadOutcome {
        let Some(lease) = self.guards.try_acquire(key, LoadKind::Open) else {
            debug!(%key, "Refresh rejected, load in flight");
            return LoadOutcome::Rejected(Rejection::Busy);
        };
        self.cache.clear(key);
        self.load_first(lease).await
    }

    async fn load_first(&self, lease: LoadLease) -> LoadOutcome {
        let key = lease.key();
        let result = self
            .gateway
            .select_mailbox(key.account(), key.mailbox(), self.page_size())
            .await;

        let outcome = match result {
            Ok(selection) => {
                let count = selection.records.len();
                let has_more = count == self.page_size() as usize;
                let total = selection
                    .total_count
                    .max(u32::try_from(count).unwrap_or(u32::MAX));
                self.cache.replace(key, selection.records, total, has_more);
                self.dismiss_error(key);
                info!(%key, count, total, "Mailbox opened");
                LoadOutcome::Applied { count }
            }
            Err(e) => {
                self.cache.mark_failed(key);
                LoadOutcome::Failed(self.record_error(key, &e))
            }
        };
        drop(lease);
        outcome
    }

    /// Replace the visible content of `key` with `page`.
    ///
    /// The page number only changes once the page's records are committed,
    /// and both change in the same cache update. On failure the visible page
    /// stays where it was and the records are replaced by a failure marker.
    /// A page past the end of the mailbox is rejected without touching the
    /// cache, whether the known total or the server reveals it.
    pub async fn jump(&self, key: &CacheKey, page: u32) -> LoadOutcome {
        if page < 1 {
            return LoadOutcome::Rejected(Rejection::OutOfRange);
        }
        let Some(lease) = self.guards.try_acquire(key, LoadKind::Jump(page)) else {
            debug!(%key, page, "Jump rejected, load in flight");
            return LoadOutcome::Rejected(Rejection::Busy);
        };

        let known = self.cache.get(key);
        if let Some(entry) = &known {
            if page > entry.total_pages(self.page_size()).max(1) {
                debug!(%key, page, total = entry.total_count, "Jump out of range");
                return LoadOutcome::Rejected(Rejection::OutOfRange);
            }
            if !entry.is_failed() && entry.current_page == page {
                return LoadOutcome::Rejected(Rejection::AlreadyVisible);
            }
        }
        let Some(offset) = (page - 1).checked_mul(self.page_size()) else {
            return LoadOutcome::Rejected(Rejection::OutOfRange);
        };

        let result = self
            .gateway
            .list_page(key.account(), key.mailbox(), offset, self.page_size())
            .await;

        let outcome = match result {
            Ok(records) if records.is_empty() && page > 1 => {
                debug!(%key, page, "Jump past the end of the mailbox");
                LoadOutcome::Rejected(Rejection::OutOfRange)
            }
            Ok(records) => {
                let count = records.len();
                let has_more = count == self.page_size() as usize;
                let known_total = known.as_ref().map_or(0, |e| e.total_count);
                let seen = offset.saturating_add(u32::try_from(count).unwrap_or(u32::MAX));
                let total = if count == 0 {
                    known_total
                } else {
                    known_total.max(seen)
                };
                self.cache
                    .commit_page(key, page, offset, records, total, has_more);
                self.dismiss_error(key);
                LoadOutcome::Applied { count }
            }
            Err(e) => {
                self.cache.mark_failed(key);
                LoadOutcome::Failed(self.record_error(key, &e))
            }
        };
        drop(lease);
        outcome
    }

    /// Load the next chunk after the visible feed and append it.
    ///
    /// Growth continues from the end of whatever is shown, including a
    /// jumped-to page. Failures leave the cached content untouched.
    pub async fn grow(&self, key: &CacheKey) -> LoadOutcome {
        let Some(lease) = self.guards.try_acquire(key, LoadKind::Grow) else {
            return LoadOutcome::Rejected(Rejection::Busy);
        };
        let Some(entry) = self.cache.get(key) else {
            return LoadOutcome::Rejected(Rejection::NotLoaded);
        };
        if !entry.has_more {
            return LoadOutcome::Rejected(Rejection::Exhausted);
        }
        let loaded = u32::try_from(entry.records.len()).unwrap_or(u32::MAX);
        let offset = entry.base_offset.saturating_add(loaded);

        let result = self
            .gateway
            .list_page(key.account(), key.mailbox(), offset, self.page_size())
            .await;

        let outcome = match result {
            Ok(records) => {
                let has_more = records.len() == self.page_size() as usize;
                let count = self.cache.extend_feed(key, records, has_more);
                self.dismiss_error(key);
                LoadOutcome::Applied { count }
            }
            Err(e) => LoadOutcome::Failed(self.record_error(key, &e)),
        };
        drop(lease);
        outcome
    }

    /// Delete messages on the server, then drop them from the cache.
    ///
    /// Nothing is removed locally unless the gateway confirms the delete.
    ///
    /// # Errors
    ///
    /// Returns the classified error if the gateway rejects the delete; the
    /// error is also stored for `key`.
    pub async fn delete(&self, key: &CacheKey, uids: &[Uid]) -> Result<usize, ErrorNotice> {
        if uids.is_empty() {
            return Ok(0);
        }
        match self
            .gateway
            .delete_by_uid(key.account(), key.mailbox(), uids)
            .await
        {
            Ok(()) => {
                let removed = self.cache.remove_by_uid(uids);
                info!(%key, requested = uids.len(), removed, "Messages deleted");
                Ok(removed)
            }
            Err(e) => Err(self.record_error(key, &e)),
        }
    }
}
