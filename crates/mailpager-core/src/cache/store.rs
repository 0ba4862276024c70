//! In-memory header cache.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::model::{EmailHeaderRecord, LoadState, MailboxCacheEntry, Uid};
use crate::{AccountId, CacheKey};

/// Volatile cache of mailbox headers, one entry per [`CacheKey`].
///
/// Every mutation happens under a single write lock, so a reader taking a
/// [`HeaderCache::get`] snapshot sees either the state before or after a
/// mutation, never a mix. The cache performs no I/O.
#[derive(Debug, Default)]
pub struct HeaderCache {
    entries: RwLock<HashMap<CacheKey, MailboxCacheEntry>>,
}

impl HeaderCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, MailboxCacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, MailboxCacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the entry for `key`, if it has been loaded.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<MailboxCacheEntry> {
        self.read().get(key).cloned()
    }

    /// Returns true if `key` has an entry (loaded or failed).
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.read().contains_key(key)
    }

    /// Number of keys currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Replace the entry for `key` wholesale, showing page 1.
    pub fn replace(
        &self,
        key: &CacheKey,
        records: Vec<EmailHeaderRecord>,
        total_count: u32,
        has_more: bool,
    ) {
        self.commit_page(key, 1, 0, records, total_count, has_more);
    }

    /// Replace the entry for `key` with the data of `page`.
    ///
    /// Records and page number are stored in the same critical section.
    pub fn commit_page(
        &self,
        key: &CacheKey,
        page: u32,
        base_offset: u32,
        records: Vec<EmailHeaderRecord>,
        total_count: u32,
        has_more: bool,
    ) {
        let records = dedup(records);
        debug!(%key, page, count = records.len(), total_count, has_more, "Committing page");
        self.write().insert(
            key.clone(),
            MailboxCacheEntry {
                records,
                total_count,
                has_more,
                current_page: page.max(1),
                base_offset,
                state: LoadState::Loaded,
            },
        );
    }

    /// Replace the records of `key` with an explicit failure marker.
    ///
    /// The visible page and total count are kept. A key with no entry gets a
    /// failed entry on page 1.
    pub fn mark_failed(&self, key: &CacheKey) {
        let mut entries = self.write();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| MailboxCacheEntry {
                records: Vec::new(),
                total_count: 0,
                has_more: false,
                current_page: 1,
                base_offset: 0,
                state: LoadState::Failed,
            });
        entry.records.clear();
        entry.has_more = false;
        entry.state = LoadState::Failed;
    }

    /// Append records after the existing sequence, skipping known UIDs.
    ///
    /// Returns the number of records actually added. Does nothing for a key
    /// that has not been loaded.
    pub fn append(&self, key: &CacheKey, records: Vec<EmailHeaderRecord>) -> usize {
        self.write()
            .get_mut(key)
            .map_or(0, |entry| merge(&mut entry.records, records, Position::Back))
    }

    /// Append a scroll-growth chunk and update `has_more` in one step.
    pub fn extend_feed(
        &self,
        key: &CacheKey,
        records: Vec<EmailHeaderRecord>,
        has_more: bool,
    ) -> usize {
        let mut entries = self.write();
        let Some(entry) = entries.get_mut(key) else {
            return 0;
        };
        let added = merge(&mut entry.records, records, Position::Back);
        entry.has_more = has_more;
        debug!(%key, added, has_more, "Extended feed");
        added
    }

    /// Insert records before the existing sequence, skipping known UIDs.
    ///
    /// The total count grows by the number of records added.
    pub fn prepend(&self, key: &CacheKey, records: Vec<EmailHeaderRecord>) -> usize {
        let mut entries = self.write();
        let Some(entry) = entries.get_mut(key) else {
            return 0;
        };
        let added = merge(&mut entry.records, records, Position::Front);
        entry.total_count = entry
            .total_count
            .saturating_add(u32::try_from(added).unwrap_or(u32::MAX));
        added
    }

    /// Remove records with the given UIDs from every cached mailbox.
    ///
    /// Meant for UIDs deleted from one server mailbox that may be cached
    /// under several keys. Only entries that actually held one of the UIDs
    /// have their total count lowered.
    ///
    /// Returns the number of records removed across all keys.
    pub fn remove_by_uid(&self, uids: &[Uid]) -> usize {
        if uids.is_empty() {
            return 0;
        }
        let doomed: HashSet<Uid> = uids.iter().copied().collect();
        let mut removed = 0;
        for (key, entry) in self.write().iter_mut() {
            let before = entry.records.len();
            entry.records.retain(|r| !doomed.contains(&r.uid));
            let gone = before - entry.records.len();
            if gone == 0 {
                continue;
            }
            debug!(%key, gone, "Dropped deleted headers");
            entry.total_count = entry
                .total_count
                .saturating_sub(u32::try_from(gone).unwrap_or(u32::MAX));
            removed += gone;
        }
        debug!(requested = uids.len(), removed, "Removed headers by UID");
        removed
    }

    /// Drop the entry for `key`, returning it to the "not loaded" state.
    pub fn clear(&self, key: &CacheKey) -> bool {
        let existed = self.write().remove(key).is_some();
        debug!(%key, existed, "Cleared mailbox cache");
        existed
    }

    /// Drop every entry belonging to `account`.
    pub fn remove_account(&self, account: &AccountId) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, _| key.account() != account);
        before - entries.len()
    }
}

#[derive(Clone, Copy)]
enum Position {
    Front,
    Back,
}

/// Merge `incoming` into `existing`, first write wins on duplicate UIDs.
fn merge(
    existing: &mut Vec<EmailHeaderRecord>,
    incoming: Vec<EmailHeaderRecord>,
    position: Position,
) -> usize {
    let mut seen: HashSet<Uid> = existing.iter().map(|r| r.uid).collect();
    let fresh: Vec<EmailHeaderRecord> = incoming
        .into_iter()
        .filter(|r| seen.insert(r.uid))
        .collect();
    let added = fresh.len();
    match position {
        Position::Back => existing.extend(fresh),
        Position::Front => {
            let older = std::mem::replace(existing, fresh);
            existing.extend(older);
        }
    }
    added
}

fn dedup(records: Vec<EmailHeaderRecord>) -> Vec<EmailHeaderRecord> {
    let mut out = Vec::with_capacity(records.len());
    merge(&mut out, records, Position::Back);
    out
}
