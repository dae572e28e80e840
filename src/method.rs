//! Authentication method identifiers.
//!
//! [`AuthMethod`] names the four ways a connection can authenticate through
//! the bridge. The password method is the mandatory fallback and can never
//! be removed from a configuration (see
//! [`SelectorConfig::candidate_order`](crate::config::SelectorConfig::candidate_order)).

use serde::Deserialize;

/// Authentication methods supported by the bridge.
///
/// # Example
///
/// ```
/// use dbauth_bridge::AuthMethod;
///
/// assert_eq!(AuthMethod::Ticket.as_str(), "ticket");
/// assert!(AuthMethod::Password.is_fallback());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Legacy username/password against the plain password table.
    ///
    /// Always enabled; the terminal fallback for every configuration.
    Password,

    /// Bearer-token exchange against an external authorization server.
    Token,

    /// Multi-round-trip ticket/SSO security-context negotiation.
    Ticket,

    /// Encrypted-secret lookup from the vault.
    SecretStore,
}

impl AuthMethod {
    /// Stable string name used in configuration and audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Token => "token",
            Self::Ticket => "ticket",
            Self::SecretStore => "secret_store",
        }
    }

    /// Whether this is the mandatory fallback method.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Password)
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
