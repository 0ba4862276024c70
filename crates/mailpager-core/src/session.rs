//! Per-window view over the cache: active mailbox, selection and search.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::cache::{EmailHeaderRecord, MailboxCacheEntry, SearchFilter, Uid};
use crate::gateway::MailGateway;
use crate::pager::{ErrorNotice, LoadOutcome, Pager, Rejection};
use crate::push::PushListener;
use crate::selection::SelectionState;
use crate::{AccountId, CacheKey};

/// State backing one message list.
///
/// Tracks which mailbox is active, the selection over its rows and the
/// search query. The selection is reset in the same call that changes the
/// active mailbox.
#[derive(Debug)]
pub struct MailboxSession<G: MailGateway> {
    pager: Arc<Pager<G>>,
    active: watch::Sender<Option<CacheKey>>,
    selection: SelectionState,
    search: SearchFilter,
    listener: Option<PushListener>,
}

impl<G: MailGateway> MailboxSession<G> {
    /// Create a session with no active mailbox and no push listener.
    #[must_use]
    pub fn new(pager: Arc<Pager<G>>) -> Self {
        let (active, _) = watch::channel(None);
        Self {
            pager,
            active,
            selection: SelectionState::new(),
            search: SearchFilter::default(),
            listener: None,
        }
    }

    /// Start merging new-mail notifications for the active mailbox.
    ///
    /// Must be called from within a tokio runtime. Calling it again replaces
    /// the previous listener.
    pub fn start_push(&mut self) {
        self.listener = Some(PushListener::spawn(
            Arc::clone(&self.pager),
            self.active.subscribe(),
        ));
    }

    /// Stop merging new-mail notifications.
    pub fn stop_push(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.unsubscribe();
        }
    }

    /// The coordinator behind this session.
    #[must_use]
    pub const fn pager(&self) -> &Arc<Pager<G>> {
        &self.pager
    }

    /// Key of the active mailbox.
    #[must_use]
    pub fn active_key(&self) -> Option<CacheKey> {
        self.active.borrow().clone()
    }

    /// Watch the active key, e.g. to re-render on mailbox switches.
    #[must_use]
    pub fn watch_active(&self) -> watch::Receiver<Option<CacheKey>> {
        self.active.subscribe()
    }

    fn set_active(&mut self, key: Option<CacheKey>) {
        self.selection.cancel();
        self.search = SearchFilter::default();
        self.active.send_replace(key);
    }

    /// Make a mailbox active and load it if it is not cached yet.
    ///
    /// Selection and search are reset before anything is awaited. Returns
    /// `None` when the mailbox was already cached.
    pub async fn switch_mailbox(
        &mut self,
        account: Option<&AccountId>,
        mailbox: Option<&str>,
    ) -> Option<LoadOutcome> {
        let key = CacheKey::derive(account, mailbox);
        debug!(key = ?key, "Switching mailbox");
        self.set_active(key.clone());

        let Some(key) = key else {
            return Some(LoadOutcome::Rejected(Rejection::NoKey));
        };
        match self.pager.entry(&key) {
            Some(entry) if !entry.is_failed() => None,
            _ => Some(self.pager.open(&key).await),
        }
    }

    /// Drop every cached mailbox of `account`, deactivating it if active.
    pub fn remove_account(&mut self, account: &AccountId) -> usize {
        if self
            .active_key()
            .is_some_and(|key| key.account() == account)
        {
            self.set_active(None);
        }
        self.pager.cache().remove_account(account)
    }

    /// Jump to `page` of the active mailbox.
    pub async fn jump(&self, page: u32) -> LoadOutcome {
        match self.active_key() {
            Some(key) => self.pager.jump(&key, page).await,
            None => LoadOutcome::Rejected(Rejection::NoKey),
        }
    }

    /// Load the next chunk of the active mailbox.
    pub async fn grow(&self) -> LoadOutcome {
        match self.active_key() {
            Some(key) => self.pager.grow(&key).await,
            None => LoadOutcome::Rejected(Rejection::NoKey),
        }
    }

    /// Reload the active mailbox from page 1, dropping the selection.
    pub async fn refresh(&mut self) -> LoadOutcome {
        let Some(key) = self.active_key() else {
            return LoadOutcome::Rejected(Rejection::NoKey);
        };
        self.selection.cancel();
        self.pager.refresh(&key).await
    }

    /// Delete the checked rows, or the open row if nothing is checked.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error; the cache and selection are left
    /// untouched in that case.
    pub async fn delete_selected(&mut self) -> Result<usize, ErrorNotice> {
        let Some(key) = self.active_key() else {
            return Ok(0);
        };
        let uids: Vec<Uid> = if self.selection.multi_select_active() {
            self.selection.selected().iter().copied().collect()
        } else {
            self.selection.open_uid().into_iter().collect()
        };
        let removed = self.pager.delete(&key, &uids).await?;
        self.selection.prune(&uids);
        Ok(removed)
    }

    /// Snapshot of the active mailbox's cache entry.
    #[must_use]
    pub fn entry(&self) -> Option<MailboxCacheEntry> {
        self.active_key().and_then(|key| self.pager.entry(&key))
    }

    /// Rows of the active mailbox that match the search query.
    #[must_use]
    pub fn visible_records(&self) -> Vec<EmailHeaderRecord> {
        self.entry().map_or_else(Vec::new, |entry| {
            entry
                .records
                .into_iter()
                .filter(|r| self.search.matches(r))
                .collect()
        })
    }

    /// Page shown for the active mailbox.
    #[must_use]
    pub fn current_page(&self) -> Option<u32> {
        self.entry().map(|e| e.current_page)
    }

    /// Number of pages in the active mailbox.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.entry()
            .map_or(0, |e| e.total_pages(self.pager.config().page_size))
    }

    /// Whether a load for the active mailbox is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.active_key()
            .is_some_and(|key| self.pager.is_loading(&key))
    }

    /// Page being jumped to, while the jump is in flight.
    #[must_use]
    pub fn pending_page(&self) -> Option<u32> {
        self.active_key()
            .and_then(|key| self.pager.pending_page(&key))
    }

    /// Error from the last failed load of the active mailbox.
    #[must_use]
    pub fn last_error(&self) -> Option<ErrorNotice> {
        self.active_key()
            .and_then(|key| self.pager.last_error(&key))
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Flip the checkbox of a row.
    pub fn toggle_checkbox(&mut self, uid: Uid) {
        self.selection.toggle_checkbox(uid);
    }

    /// Check every row matching the search query.
    pub fn select_all(&mut self) {
        let visible: Vec<Uid> = self.visible_records().iter().map(|r| r.uid).collect();
        self.selection.select_all(visible);
    }

    /// Uncheck every row.
    pub fn deselect_all(&mut self) {
        self.selection.deselect_all();
    }

    /// Open a row for reading.
    pub fn open_row(&mut self, uid: Uid) {
        self.selection.open_row(uid);
    }

    /// Return the selection to idle.
    pub fn cancel_selection(&mut self) {
        self.selection.cancel();
    }

    /// Narrow the visible rows to those matching `query`.
    pub fn set_search(&mut self, query: &str) {
        self.search = SearchFilter::new(query, self.pager.config().search_snippets);
    }
}
