//! Cache key derivation.

use serde::{Deserialize, Serialize};

/// Identifier of a mail account as known to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create a new account ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one mailbox within one account.
///
/// A key can only be built from a non-empty account id and a non-empty
/// mailbox path, so holding a `CacheKey` proves both are present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    account: AccountId,
    mailbox: String,
}

impl CacheKey {
    /// Derives a key from an optional account and mailbox.
    ///
    /// Returns `None` when either component is missing or empty.
    #[must_use]
    pub fn derive(account: Option<&AccountId>, mailbox: Option<&str>) -> Option<Self> {
        let account = account.filter(|a| !a.0.trim().is_empty())?;
        let mailbox = mailbox.filter(|m| !m.trim().is_empty())?;
        Some(Self {
            account: account.clone(),
            mailbox: mailbox.to_string(),
        })
    }

    /// Convenience form of [`CacheKey::derive`] for plain strings.
    #[must_use]
    pub fn new(account: &str, mailbox: &str) -> Option<Self> {
        Self::derive(Some(&AccountId::new(account)), Some(mailbox))
    }

    /// Account this mailbox belongs to.
    #[must_use]
    pub const fn account(&self) -> &AccountId {
        &self.account
    }

    /// Mailbox path within the account.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Returns true if this key names the given account and mailbox.
    #[must_use]
    pub fn matches(&self, account: &AccountId, mailbox: &str) -> bool {
        self.account == *account && self.mailbox == mailbox
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account, self.mailbox)
    }
}
