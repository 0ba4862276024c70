//! In-memory gateway implementation.
//!
//! Serves headers from memory. Used by tests and by the demo binary in place
//! of a real server connection.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, Semaphore, mpsc};

use super::{GatewayError, MailGateway, MailboxSelection, NewMailNotice};
use crate::AccountId;
use crate::cache::{EmailHeaderRecord, Uid};

type MailboxKey = (AccountId, String);

/// Holds gateway calls until released.
///
/// Returned by [`MemoryGateway::pause`]. Every call made while the gateway is
/// paused waits for one [`PauseGate::release`].
#[derive(Debug, Clone)]
pub struct PauseGate {
    permits: Arc<Semaphore>,
    entered: Arc<Notify>,
}

impl PauseGate {
    fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
            entered: Arc::new(Notify::new()),
        }
    }

    /// Let one waiting (or future) call proceed.
    pub fn release(&self) {
        self.permits.add_permits(1);
    }

    /// Wait until a call has reached the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// Gateway backed by in-memory mailboxes.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    mailboxes: Mutex<HashMap<MailboxKey, Vec<EmailHeaderRecord>>>,
    failures: Mutex<VecDeque<GatewayError>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<NewMailNotice>>>,
    gate: Mutex<Option<PauseGate>>,
    calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryGateway {
    /// Create a gateway with no mailboxes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the contents of a mailbox, newest first.
    pub fn seed(&self, account: &AccountId, mailbox: &str, records: Vec<EmailHeaderRecord>) {
        lock(&self.mailboxes).insert((account.clone(), mailbox.to_string()), records);
    }

    /// Add newly arrived messages to the top of a mailbox and notify subscribers.
    pub fn deliver(&self, account: &AccountId, mailbox: &str, records: Vec<EmailHeaderRecord>) {
        let count = u32::try_from(records.len()).unwrap_or(u32::MAX);
        {
            let mut mailboxes = lock(&self.mailboxes);
            let stored = mailboxes
                .entry((account.clone(), mailbox.to_string()))
                .or_default();
            let older = std::mem::replace(stored, records);
            stored.extend(older);
        }
        self.announce(NewMailNotice {
            account: account.clone(),
            mailbox: mailbox.to_string(),
            count,
        });
    }

    /// Send a notification to every live subscriber.
    pub fn announce(&self, notice: NewMailNotice) {
        lock(&self.subscribers).retain(|tx| tx.send(notice.clone()).is_ok());
    }

    /// Make the next gateway call fail with `error`.
    pub fn fail_next(&self, error: GatewayError) {
        lock(&self.failures).push_back(error);
    }

    /// Hold every subsequent call until released through the returned gate.
    pub fn pause(&self) -> PauseGate {
        let gate = PauseGate::new();
        *lock(&self.gate) = Some(gate.clone());
        gate
    }

    /// Stop holding new calls. Calls already waiting still need a release.
    pub fn resume(&self) {
        *lock(&self.gate) = None;
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of messages stored in a mailbox.
    #[must_use]
    pub fn message_count(&self, account: &AccountId, mailbox: &str) -> usize {
        lock(&self.mailboxes)
            .get(&(account.clone(), mailbox.to_string()))
            .map_or(0, Vec::len)
    }

    async fn enter(&self) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        lock(&self.failures).pop_front().map_or(Ok(()), Err)
    }

    fn slice(
        &self,
        account: &AccountId,
        mailbox: &str,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<EmailHeaderRecord>, u32), GatewayError> {
        let mailboxes = lock(&self.mailboxes);
        let stored = mailboxes
            .get(&(account.clone(), mailbox.to_string()))
            .ok_or_else(|| GatewayError::NotFound(mailbox.to_string()))?;
        let records = stored
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        let total = u32::try_from(stored.len()).unwrap_or(u32::MAX);
        Ok((records, total))
    }
}

impl MailGateway for MemoryGateway {
    async fn list_page(
        &self,
        account: &AccountId,
        mailbox: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<EmailHeaderRecord>, GatewayError> {
        self.enter().await?;
        self.slice(account, mailbox, offset, limit)
            .map(|(records, _)| records)
    }

    async fn select_mailbox(
        &self,
        account: &AccountId,
        mailbox: &str,
        initial_limit: u32,
    ) -> Result<MailboxSelection, GatewayError> {
        self.enter().await?;
        let (records, total_count) = self.slice(account, mailbox, 0, initial_limit)?;
        Ok(MailboxSelection {
            records,
            total_count,
        })
    }

    async fn delete_by_uid(
        &self,
        account: &AccountId,
        mailbox: &str,
        uids: &[Uid],
    ) -> Result<(), GatewayError> {
        self.enter().await?;
        let doomed: HashSet<Uid> = uids.iter().copied().collect();
        let mut mailboxes = lock(&self.mailboxes);
        let stored = mailboxes
            .get_mut(&(account.clone(), mailbox.to_string()))
            .ok_or_else(|| GatewayError::NotFound(mailbox.to_string()))?;
        stored.retain(|r| !doomed.contains(&r.uid));
        Ok(())
    }

    fn subscribe_new_mail(&self) -> mpsc::UnboundedReceiver<NewMailNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }
}
