//! Interface to the remote mail gateway.
//!
//! The gateway performs the protocol-level work (listing, selecting,
//! deleting, watching). This crate only consumes it.

mod memory;

use std::future::Future;

use tokio::sync::mpsc;

use crate::AccountId;
use crate::cache::{EmailHeaderRecord, Uid};

pub use memory::{MemoryGateway, PauseGate};

/// Errors reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Connection failed or was interrupted.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Mailbox does not exist.
    #[error("Mailbox not found: {0}")]
    NotFound(String),

    /// Network-level failure (DNS, reset, unreachable).
    #[error("Network error: {0}")]
    Network(String),

    /// Operation failed.
    #[error("Operation failed: {0}")]
    Operation(String),
}

/// Result of selecting a mailbox for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxSelection {
    /// Newest headers, at most the requested limit.
    pub records: Vec<EmailHeaderRecord>,
    /// Authoritative number of messages in the mailbox.
    pub total_count: u32,
}

/// Notification that new mail arrived in a mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMailNotice {
    /// Account the mailbox belongs to.
    pub account: AccountId,
    /// Mailbox path.
    pub mailbox: String,
    /// Number of newly arrived messages.
    pub count: u32,
}

/// Remote source of mailbox headers.
///
/// Implementations own connection handling and timeouts. All futures must be
/// `Send` so loads can run on spawned tasks.
pub trait MailGateway: Send + Sync + 'static {
    /// List `limit` headers starting at `offset`, newest first.
    fn list_page(
        &self,
        account: &AccountId,
        mailbox: &str,
        offset: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<EmailHeaderRecord>, GatewayError>> + Send;

    /// Select a mailbox, returning its newest headers and total count.
    fn select_mailbox(
        &self,
        account: &AccountId,
        mailbox: &str,
        initial_limit: u32,
    ) -> impl Future<Output = Result<MailboxSelection, GatewayError>> + Send;

    /// Delete the messages with the given UIDs.
    fn delete_by_uid(
        &self,
        account: &AccountId,
        mailbox: &str,
        uids: &[Uid],
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Subscribe to new-mail notifications.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe_new_mail(&self) -> mpsc::UnboundedReceiver<NewMailNotice>;
}
