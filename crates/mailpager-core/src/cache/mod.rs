//! Volatile per-mailbox header cache.
//!
//! This module holds the cached header sequences and their pagination
//! metadata. It owns no fetching logic.

mod filter;
mod model;
mod store;

pub use filter::SearchFilter;
pub use model::{EmailHeaderRecord, LoadState, MailboxCacheEntry, MessageFlag, Uid};
pub use store::HeaderCache;
