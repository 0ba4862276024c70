//! Merging of server-pushed new mail into the cache.
//!
//! Push updates bypass the load guard. They only touch the mailbox that is
//! active when the notification arrives; others are dropped and reconciled by
//! the next explicit load.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::CacheKey;
use crate::config::PushMergePolicy;
use crate::gateway::{MailGateway, NewMailNotice};
use crate::pager::Pager;

/// Why a notification did not change the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushSkip {
    /// Notification is for a mailbox that is not active.
    Inactive,
    /// The active mailbox has not been loaded.
    NotLoaded,
    /// A page other than the first is shown and the policy forbids merging.
    OffFirstPage,
    /// The notification announced no messages.
    Empty,
}

/// Result of handling one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Headers were prepended.
    Merged {
        /// Records not already cached.
        added: usize,
    },
    /// Nothing to do.
    Skipped(PushSkip),
    /// The fetch failed; logged and otherwise ignored.
    Failed,
}

/// Fetch the announced newest headers and prepend them to the active mailbox.
pub async fn merge_new_mail<G: MailGateway>(
    pager: &Pager<G>,
    active: Option<&CacheKey>,
    notice: &NewMailNotice,
) -> PushOutcome {
    let Some(key) = active.filter(|k| k.matches(&notice.account, &notice.mailbox)) else {
        debug!(account = %notice.account, mailbox = %notice.mailbox, "Ignoring new mail for inactive mailbox");
        return PushOutcome::Skipped(PushSkip::Inactive);
    };
    if notice.count == 0 {
        return PushOutcome::Skipped(PushSkip::Empty);
    }
    let Some(entry) = pager.entry(key) else {
        return PushOutcome::Skipped(PushSkip::NotLoaded);
    };
    if pager.config().push_merge == PushMergePolicy::FirstPageOnly && entry.current_page != 1 {
        debug!(%key, page = entry.current_page, "Holding new mail until page 1 is shown");
        return PushOutcome::Skipped(PushSkip::OffFirstPage);
    }

    match pager
        .gateway()
        .list_page(key.account(), key.mailbox(), 0, notice.count)
        .await
    {
        Ok(records) => {
            let added = pager.cache().prepend(key, records);
            debug!(%key, announced = notice.count, added, "Merged new mail");
            PushOutcome::Merged { added }
        }
        Err(e) => {
            warn!(%key, error = %e, "Failed to fetch new mail");
            PushOutcome::Failed
        }
    }
}

/// Background task feeding gateway notifications into the cache.
///
/// Dropping the listener (or calling [`PushListener::unsubscribe`]) stops it.
#[derive(Debug)]
pub struct PushListener {
    task: JoinHandle<()>,
}

impl PushListener {
    /// Subscribe to the gateway and merge notifications for whichever key
    /// `active` holds at arrival time.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn<G: MailGateway>(
        pager: Arc<Pager<G>>,
        active: watch::Receiver<Option<CacheKey>>,
    ) -> Self {
        let mut notices = pager.gateway().subscribe_new_mail();
        let task = tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                let current = active.borrow().clone();
                merge_new_mail(&pager, current.as_ref(), &notice).await;
            }
            debug!("New mail subscription closed");
        });
        Self { task }
    }

    /// Stop listening.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Returns true if the listener has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PushListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::HeaderCache;
    use crate::config::PagerConfig;
    use crate::gateway::{GatewayError, MemoryGateway};
    use crate::{AccountId, EmailHeaderRecord};
    use chrono::Utc;

    fn headers(uids: impl IntoIterator<Item = u32>) -> Vec<EmailHeaderRecord> {
        uids.into_iter()
            .map(|uid| EmailHeaderRecord::new(uid, "s", "f", Utc::now()))
            .collect()
    }

    async fn setup(config: PagerConfig) -> (Arc<MemoryGateway>, Arc<Pager<MemoryGateway>>, CacheKey) {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.seed(&AccountId::new("acct"), "INBOX", headers(1..=120));
        let pager = Arc::new(Pager::new(
            Arc::clone(&gateway),
            Arc::new(HeaderCache::new()),
            config,
        ));
        let key = CacheKey::new("acct", "INBOX").unwrap();
        pager.open(&key).await;
        (gateway, pager, key)
    }

    fn notice(mailbox: &str, count: u32) -> NewMailNotice {
        NewMailNotice {
            account: AccountId::new("acct"),
            mailbox: mailbox.into(),
            count,
        }
    }

    #[tokio::test]
    async fn test_merge_prepends_only_new() {
        let (gateway, pager, key) = setup(PagerConfig::default()).await;
        // Two genuinely new messages plus one that is already cached
        gateway.seed(
            &AccountId::new("acct"),
            "INBOX",
            headers([200, 201, 1]),
        );

        let outcome = merge_new_mail(&pager, Some(&key), &notice("INBOX", 3)).await;
        assert_eq!(outcome, PushOutcome::Merged { added: 2 });
        let entry = pager.entry(&key).unwrap();
        assert_eq!(entry.records.len(), 52);
        assert_eq!(entry.records[0].uid.get(), 200);
    }

    #[tokio::test]
    async fn test_inactive_mailbox_is_dropped() {
        let (gateway, pager, key) = setup(PagerConfig::default()).await;
        let calls = gateway.calls();

        let outcome = merge_new_mail(&pager, Some(&key), &notice("Sent", 2)).await;
        assert_eq!(outcome, PushOutcome::Skipped(PushSkip::Inactive));
        let outcome = merge_new_mail(&pager, None, &notice("INBOX", 2)).await;
        assert_eq!(outcome, PushOutcome::Skipped(PushSkip::Inactive));
        assert_eq!(gateway.calls(), calls);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_swallowed() {
        let (gateway, pager, key) = setup(PagerConfig::default()).await;
        gateway.fail_next(GatewayError::Connection("timed out".into()));

        let outcome = merge_new_mail(&pager, Some(&key), &notice("INBOX", 1)).await;
        assert_eq!(outcome, PushOutcome::Failed);
        assert!(pager.last_error(&key).is_none());
        assert_eq!(pager.entry(&key).unwrap().records.len(), 50);
    }

    #[tokio::test]
    async fn test_first_page_only_policy() {
        let config = PagerConfig {
            push_merge: PushMergePolicy::FirstPageOnly,
            ..PagerConfig::default()
        };
        let (_, pager, key) = setup(config).await;
        pager.jump(&key, 2).await;

        let outcome = merge_new_mail(&pager, Some(&key), &notice("INBOX", 1)).await;
        assert_eq!(outcome, PushOutcome::Skipped(PushSkip::OffFirstPage));
    }

    #[tokio::test]
    async fn test_listener_merges_delivered_mail() {
        let (gateway, pager, key) = setup(PagerConfig::default()).await;
        let (_tx, rx) = watch::channel(Some(key.clone()));
        let listener = PushListener::spawn(Arc::clone(&pager), rx);

        gateway.deliver(&AccountId::new("acct"), "INBOX", headers([500, 501]));
        for _ in 0..100 {
            if pager.entry(&key).unwrap().records.len() == 52 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(pager.entry(&key).unwrap().records[0].uid.get(), 500);

        listener.unsubscribe();
    }
}
