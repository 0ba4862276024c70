//! Cache data models.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message UID, unique within one mailbox only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(pub u32);

impl Uid {
    /// Returns the raw UID value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Flags carried by a header besides the seen state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageFlag {
    /// Flagged/starred.
    Flagged,
    /// Replied to.
    Answered,
    /// Draft message.
    Draft,
    /// Message has attachments.
    HasAttachment,
}

/// Header of one email as listed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailHeaderRecord {
    /// Message UID.
    pub uid: Uid,
    /// Message subject.
    pub subject: String,
    /// Sender display string.
    pub from: String,
    /// Message date.
    pub date: DateTime<Utc>,
    /// Whether the message has been read.
    pub seen: bool,
    /// Additional flags.
    pub flags: BTreeSet<MessageFlag>,
    /// Message snippet (preview text).
    pub snippet: Option<String>,
}

impl EmailHeaderRecord {
    /// Creates an unread header with no flags or snippet.
    #[must_use]
    pub fn new(
        uid: u32,
        subject: impl Into<String>,
        from: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: Uid(uid),
            subject: subject.into(),
            from: from.into(),
            date,
            seen: false,
            flags: BTreeSet::new(),
            snippet: None,
        }
    }

    /// Returns true if the header carries the given flag.
    #[must_use]
    pub fn has_flag(&self, flag: MessageFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Outcome of the last page-jump for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Records reflect a successful load, possibly empty.
    #[default]
    Loaded,
    /// The last page-jump failed; records are empty.
    Failed,
}

/// Cached headers and pagination metadata for one mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxCacheEntry {
    /// Headers in server order, newest first.
    pub records: Vec<EmailHeaderRecord>,
    /// Total number of messages in the mailbox, as last reported.
    pub total_count: u32,
    /// Whether the last load returned a full page.
    pub has_more: bool,
    /// Page currently shown, starting at 1.
    pub current_page: u32,
    /// Server offset of the first record in `records`.
    pub base_offset: u32,
    /// Whether the entry holds data or a failure marker.
    pub state: LoadState,
}

impl MailboxCacheEntry {
    /// Number of pages for the given page size. Zero when the total is unknown or empty.
    #[must_use]
    pub const fn total_pages(&self, page_size: u32) -> u32 {
        if page_size == 0 {
            0
        } else {
            self.total_count.div_ceil(page_size)
        }
    }

    /// Returns true if the last page-jump for this entry failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state == LoadState::Failed
    }

    /// Returns true if a record with this UID is cached.
    #[must_use]
    pub fn contains(&self, uid: Uid) -> bool {
        self.records.iter().any(|r| r.uid == uid)
    }

    /// UIDs of the cached records, in display order.
    #[must_use]
    pub fn uids(&self) -> Vec<Uid> {
        self.records.iter().map(|r| r.uid).collect()
    }
}
