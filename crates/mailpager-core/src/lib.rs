//! # mailpager-core
//!
//! Client-side cache and pagination coordinator for `MailPager`.
//!
//! This crate provides:
//! - **Header Cache** - Volatile per-mailbox header sequences with dedup merges
//! - **Pagination** - Race-safe page-jumps and scroll-growth, one load per mailbox
//! - **Selection** - Single-row viewing and multi-select bulk actions
//! - **Push Updates** - New-mail notifications merged into the active mailbox
//! - **Gateway** - The interface to the remote mail gateway, plus an in-memory implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
mod error;
pub mod gateway;
mod key;
pub mod pager;
pub mod push;
pub mod selection;
mod session;

pub use cache::{
    EmailHeaderRecord, HeaderCache, LoadState, MailboxCacheEntry, MessageFlag, SearchFilter, Uid,
};
pub use config::{DEFAULT_PAGE_SIZE, PagerConfig, PushMergePolicy};
pub use error::{Error, Result};
pub use gateway::{GatewayError, MailGateway, MailboxSelection, MemoryGateway, NewMailNotice};
pub use key::{AccountId, CacheKey};
pub use pager::{ErrorKind, ErrorNotice, LoadKind, LoadOutcome, Pager, Rejection};
pub use push::{PushListener, PushOutcome, PushSkip, merge_new_mail};
pub use selection::{SelectionMode, SelectionState};
pub use session::MailboxSession;
