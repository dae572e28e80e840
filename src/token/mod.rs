//! Bearer-token types and the token-exchange bridge.
//!
//! [`AuthToken`] is the in-memory representation of a token obtained from
//! the external authorization server; [`TokenBridge`] performs the
//! password-grant exchange, server-side introspection, and refresh against
//! that server. Tokens are never persisted and never verified locally.

mod bridge;

pub use bridge::TokenBridge;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

/// The only token type the bridge accepts.
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// A bearer token issued by the external authorization server.
///
/// # Security
///
/// - Token strings are zeroized when dropped
/// - The [`Debug`] implementation redacts both tokens
/// - `is_expired()` is a cache hint only: validity MUST be re-checked via
///   [`TokenBridge::validate`] before each privileged use
#[derive(Clone)]
pub struct AuthToken {
    /// Opaque or signed access token (zeroized on drop).
    access_token: Zeroizing<String>,

    /// Optional refresh token (zeroized on drop).
    refresh_token: Option<Zeroizing<String>>,

    /// Token type as reported by the server (always `Bearer`).
    token_type: String,

    /// When the exchange completed locally.
    issued_at: DateTime<Utc>,

    /// Lifetime in seconds as reported by the server (always > 0).
    expires_in: u64,
}

impl AuthToken {
    /// Build a token from the server's flat key-value response.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Protocol` for a non-bearer token type or a
    /// non-positive lifetime.
    pub fn from_response(response: TokenResponse) -> Result<Self> {
        if !response.token_type.eq_ignore_ascii_case(TOKEN_TYPE_BEARER) {
            return Err(AuthError::Protocol(format!(
                "unsupported token type: {}",
                response.token_type
            )));
        }
        if response.expires_in == 0 {
            return Err(AuthError::Protocol(
                "token response carried a zero lifetime".to_string(),
            ));
        }

        Ok(Self {
            access_token: Zeroizing::new(response.access_token),
            refresh_token: response.refresh_token.map(Zeroizing::new),
            token_type: response.token_type,
            issued_at: Utc::now(),
            expires_in: response.expires_in,
        })
    }

    /// The access token string.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The refresh token, if the server issued one.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().map(String::as_str)
    }

    /// Token type reported by the server.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// When the exchange completed.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Derived expiry instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.expires_in as i64)
    }

    /// Local expiry comparison.
    ///
    /// A cache hint, not a trust decision: the issuing authority may have
    /// revoked the token regardless of what this returns.
    pub fn is_expired(&self) -> bool {
        self.expires_at() < Utc::now()
    }
}

// Custom Debug implementation that redacts both tokens
impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("issued_at", &self.issued_at)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Flat key-value token-endpoint response (password and refresh grants).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// The issued access token.
    pub access_token: String,
    /// Token type (expected `Bearer`).
    pub token_type: String,
    /// Optional refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Introspection-endpoint response.
#[derive(Debug, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active.
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(expires_in: u64) -> TokenResponse {
        TokenResponse {
            access_token: "tok-abc".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("refresh-xyz".to_string()),
            expires_in,
        }
    }

    #[test]
    fn test_from_response() {
        let token = AuthToken::from_response(response(3600)).unwrap();
        assert_eq!(token.access_token(), "tok-abc");
        assert_eq!(token.refresh_token(), Some("refresh-xyz"));
        assert_eq!(token.token_type(), "Bearer");
        assert!(!token.is_expired());
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        assert!(AuthToken::from_response(response(0)).is_err());
    }

    #[test]
    fn test_non_bearer_rejected() {
        let mut resp = response(3600);
        resp.token_type = "MAC".to_string();
        assert!(AuthToken::from_response(resp).is_err());
    }

    #[test]
    fn test_bearer_case_insensitive() {
        let mut resp = response(3600);
        resp.token_type = "bearer".to_string();
        assert!(AuthToken::from_response(resp).is_ok());
    }

    #[test]
    fn test_expires_at_derived() {
        let token = AuthToken::from_response(response(3600)).unwrap();
        assert_eq!(
            token.expires_at(),
            token.issued_at() + Duration::seconds(3600)
        );
    }

    #[test]
    fn test_expired_token_hint() {
        let token = AuthToken::from_response(response(1)).unwrap();
        // Fresh one-second token is not yet expired by the local hint.
        assert!(!token.is_expired());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let token = AuthToken::from_response(response(3600)).unwrap();
        let debug_output = format!("{:?}", token);

        assert!(!debug_output.contains("tok-abc"));
        assert!(!debug_output.contains("refresh-xyz"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("Bearer"));
    }

    #[test]
    fn test_parse_flat_response() {
        let json = r#"{"access_token":"a","token_type":"Bearer","expires_in":60}"#;
        let parsed: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "a");
        assert!(parsed.refresh_token.is_none());
    }
}
