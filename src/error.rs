//! Error types for dbauth-bridge.
//!
//! The taxonomy follows the selector's fallback contract: method-local
//! failures disqualify one authentication method and let the selector move
//! on to the next candidate; `AuthExhausted` is the only terminal failure
//! and is reachable for every configuration because the password fallback
//! is structurally always present.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the authentication bridge.
///
/// Error display strings never contain raw secret material (passwords,
/// tokens, ticket bytes); callers may log them freely.
#[derive(Error, Debug)]
pub enum AuthError {
    /// I/O error (network, file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Handshake/wire protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Token exchange against the authorization server failed
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Token introspection could not be performed (transport/protocol error,
    /// not an inactive token)
    #[error("Token validation failed: {0}")]
    TokenValidation(String),

    /// Refresh token was rejected; the caller must re-run the exchange
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// Security-context negotiation step failed
    #[error("Ticket handshake failed: {0}")]
    TicketHandshake(String),

    /// The whole multi-round-trip ticket exchange exceeded its deadline
    #[error("Ticket negotiation timed out after {0:?}")]
    TicketTimeout(Duration),

    /// Mapped local name has no matching local identity
    #[error("Principal not mapped to a local identity: {0}")]
    PrincipalNotMapped(String),

    /// Secret missing from the vault; callers fall back to the plain
    /// password table
    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    /// Operator error: a bridge is enabled but lacks required configuration
    #[error("Bridge misconfigured: {0}")]
    BridgeMisconfigured(String),

    /// A single method attempt exceeded the per-method deadline
    #[error("Authentication method timed out after {0:?}")]
    MethodTimeout(Duration),

    /// Local identity store lookup failed
    #[error("Identity directory error: {0}")]
    Directory(String),

    /// Every enabled method, including the password fallback, failed
    #[error("All authentication methods exhausted")]
    AuthExhausted,
}

impl AuthError {
    /// Whether this failure only disqualifies a single method attempt.
    ///
    /// Method-local failures let the selector continue to the next
    /// candidate; everything else aborts the connection attempt.
    pub fn is_method_local(&self) -> bool {
        matches!(
            self,
            Self::TokenExchange(_)
                | Self::TokenValidation(_)
                | Self::TokenRefresh(_)
                | Self::TicketHandshake(_)
                | Self::TicketTimeout(_)
                | Self::PrincipalNotMapped(_)
                | Self::SecretNotFound(_)
                | Self::BridgeMisconfigured(_)
                | Self::MethodTimeout(_)
                | Self::Directory(_)
        )
    }

    /// Whether this failure is a deadline violation rather than a
    /// protocol-level rejection.
    ///
    /// Operators use this distinction to tell "external service
    /// unreachable/slow" apart from "credentials invalid".
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TicketTimeout(_) | Self::MethodTimeout(_))
    }
}

/// Result type alias for AuthError
pub type Result<T> = std::result::Result<T, AuthError>;

impl From<serde_yaml::Error> for AuthError {
    fn from(err: serde_yaml::Error) -> Self {
        AuthError::Config(err.to_string())
    }
}
