//! Classified, user-facing load errors.

use crate::gateway::GatewayError;

/// Category of a failed gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transient connection failure.
    Connection,
    /// Credentials or token rejected.
    Auth,
    /// DNS, reset or unreachable host.
    Network,
    /// Mailbox no longer exists.
    NotFound,
}

impl ErrorKind {
    /// Classify a gateway error.
    ///
    /// Connection and operation failures whose message points at the
    /// transport are reported as [`ErrorKind::Network`].
    #[must_use]
    pub fn classify(error: &GatewayError) -> Self {
        match error {
            GatewayError::Auth(_) => Self::Auth,
            GatewayError::NotFound(_) => Self::NotFound,
            GatewayError::Network(_) => Self::Network,
            GatewayError::Connection(msg) | GatewayError::Operation(msg) => {
                if looks_like_network(msg) {
                    Self::Network
                } else if looks_like_auth(msg) {
                    Self::Auth
                } else {
                    Self::Connection
                }
            }
        }
    }

    /// What the user should do about it.
    #[must_use]
    pub const fn guidance(self) -> &'static str {
        match self {
            Self::Connection => "Could not reach the mail server. Please try again.",
            Self::Auth => "Your session is no longer valid. Please sign in again.",
            Self::Network => "Network problem. Check your internet connection.",
            Self::NotFound => "This mailbox no longer exists. Refresh the folder list.",
        }
    }
}

fn looks_like_network(msg: &str) -> bool {
    const MARKERS: &[&str] = &[
        "dns",
        "enotfound",
        "econnreset",
        "connection reset",
        "unreachable",
        "name resolution",
        "no route",
    ];
    let lower = msg.to_lowercase();
    MARKERS.iter().any(|m| lower.contains(m))
}

fn looks_like_auth(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    lower.contains("auth") || lower.contains("login") || lower.contains("credential")
}

/// Error state stored for a key after a failed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    /// Classified category.
    pub kind: ErrorKind,
    /// Guidance shown to the user.
    pub guidance: &'static str,
    /// Original error text, for logs and details views.
    pub detail: String,
}

impl From<&GatewayError> for ErrorNotice {
    fn from(error: &GatewayError) -> Self {
        let kind = ErrorKind::classify(error);
        Self {
            kind,
            guidance: kind.guidance(),
            detail: error.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.guidance)
    }
}
