//! Pagination coordinator.
//!
//! Drives page-jump, scroll-growth and first-load requests against the
//! header cache, with at most one load in flight per mailbox.

mod coordinator;
mod guard;
mod status;

pub use coordinator::{LoadOutcome, Pager, Rejection};
pub use guard::{LoadGuards, LoadKind, LoadLease};
pub use status::{ErrorKind, ErrorNotice};
