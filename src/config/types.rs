//! Configuration types.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::method::AuthMethod;

/// Default per-method timeout in seconds.
const DEFAULT_METHOD_TIMEOUT_SECS: u64 = 5;

/// Default bound on simultaneous outbound calls to external services.
const DEFAULT_MAX_OUTBOUND_CALLS: usize = 16;

/// Root configuration structure.
///
/// # Example
///
/// ```yaml
/// selector:
///   method_order: [ticket, token, secret_store]
///   method_timeout_secs: 5
///
/// token:
///   token_endpoint: "https://issuer.example.com/oauth/token"
///   introspection_endpoint: "https://issuer.example.com/oauth/introspect"
///   client_id: "db-gateway"
///
/// ticket:
///   service_name: "dbgate/gateway.example.com"
///
/// directory:
///   users:
///     ALICE: "alice-password"
/// ```
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Selector configuration (method order, timeouts)
    #[serde(default)]
    pub selector: SelectorConfig,

    /// Token bridge configuration (absent disables the token method)
    #[serde(default)]
    pub token: Option<TokenConfig>,

    /// Ticket bridge configuration (absent disables the ticket method)
    #[serde(default)]
    pub ticket: Option<TicketConfig>,

    /// Secret store configuration
    #[serde(default)]
    pub secret_store: SecretStoreConfig,

    /// Static identity directory (standalone/test deployments)
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate the configuration.
    ///
    /// Enabled enterprise methods must carry their configuration section;
    /// the timeout must be non-zero. The password fallback needs no
    /// configuration and cannot be disabled.
    pub fn validate(&self) -> Result<(), String> {
        if self.selector.method_timeout_secs == 0 {
            return Err("selector.method_timeout_secs must be greater than zero".to_string());
        }
        if self.selector.max_outbound_calls == 0 {
            return Err("selector.max_outbound_calls must be greater than zero".to_string());
        }

        for method in &self.selector.method_order {
            match method {
                AuthMethod::Token if self.token.is_none() => {
                    return Err(
                        "method_order enables 'token' but no [token] section is present"
                            .to_string(),
                    );
                }
                AuthMethod::Ticket if self.ticket.is_none() => {
                    return Err(
                        "method_order enables 'ticket' but no [ticket] section is present"
                            .to_string(),
                    );
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Selector configuration: enabled methods and deadlines.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Enterprise methods in priority order.
    ///
    /// The password fallback is not listed here; it is always appended
    /// last by [`candidate_order`](Self::candidate_order).
    pub method_order: Vec<AuthMethod>,

    /// Uniform per-method timeout in seconds (default 5).
    pub method_timeout_secs: u64,

    /// Bound on simultaneous outbound calls to external services.
    pub max_outbound_calls: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            method_order: Vec::new(),
            method_timeout_secs: DEFAULT_METHOD_TIMEOUT_SECS,
            max_outbound_calls: DEFAULT_MAX_OUTBOUND_CALLS,
        }
    }
}

impl SelectorConfig {
    /// The per-method deadline.
    pub fn method_timeout(&self) -> Duration {
        Duration::from_secs(self.method_timeout_secs)
    }

    /// The ordered candidate list with the mandatory password fallback.
    ///
    /// Deduplicates the configured order, drops any explicit `password`
    /// entry, and appends `password` last. This is the structural guarantee
    /// that the fallback can never be configured away.
    ///
    /// # Example
    ///
    /// ```
    /// use dbauth_bridge::config::SelectorConfig;
    /// use dbauth_bridge::AuthMethod;
    ///
    /// let config = SelectorConfig::default();
    /// assert_eq!(config.candidate_order(), vec![AuthMethod::Password]);
    /// ```
    pub fn candidate_order(&self) -> Vec<AuthMethod> {
        let mut ordered = Vec::with_capacity(self.method_order.len() + 1);
        for method in &self.method_order {
            if !method.is_fallback() && !ordered.contains(method) {
                ordered.push(*method);
            }
        }
        ordered.push(AuthMethod::Password);
        ordered
    }
}

/// Token bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Password-grant and refresh-grant endpoint.
    pub token_endpoint: String,

    /// Token introspection endpoint.
    pub introspection_endpoint: String,

    /// Client identifier for the bridge itself.
    pub client_id: String,

    /// Static client secret, used only when the vault has no
    /// `bridge/client-secret` record.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// HTTP request timeout in seconds (default 5, clamped by the
    /// per-method deadline at the selector level anyway).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_METHOD_TIMEOUT_SECS
}

impl TokenConfig {
    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Ticket bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketConfig {
    /// Service principal name the bridge negotiates as.
    pub service_name: String,

    /// Location of the service credential store (keytab-style file).
    #[serde(default)]
    pub credential_store: Option<PathBuf>,
}

/// Secret store configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecretStoreConfig {
    /// Passphrase the vault key is derived from.
    ///
    /// When absent a random key is generated at startup (secrets do not
    /// survive a restart; fine for the in-memory mode).
    pub master_key: Option<String>,
}

/// Static identity directory configuration.
///
/// Maps local identity names to plain-table passwords. Production
/// deployments replace this with a directory reached through the database
/// collaborator; the static table serves standalone and test setups.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Local identity name -> password.
    pub users: HashMap<String, String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "dbauth_bridge=debug").
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_candidate_order_appends_password() {
        let config = SelectorConfig {
            method_order: vec![AuthMethod::Ticket, AuthMethod::Token],
            ..Default::default()
        };
        assert_eq!(
            config.candidate_order(),
            vec![AuthMethod::Ticket, AuthMethod::Token, AuthMethod::Password]
        );
    }

    #[test]
    fn test_candidate_order_strips_explicit_password() {
        // An operator listing password mid-order must not move the
        // fallback off the end.
        let config = SelectorConfig {
            method_order: vec![
                AuthMethod::Password,
                AuthMethod::Token,
                AuthMethod::Password,
            ],
            ..Default::default()
        };
        assert_eq!(
            config.candidate_order(),
            vec![AuthMethod::Token, AuthMethod::Password]
        );
    }

    #[test]
    fn test_candidate_order_dedups() {
        let config = SelectorConfig {
            method_order: vec![AuthMethod::Token, AuthMethod::Token, AuthMethod::Ticket],
            ..Default::default()
        };
        assert_eq!(
            config.candidate_order(),
            vec![AuthMethod::Token, AuthMethod::Ticket, AuthMethod::Password]
        );
    }

    #[test]
    fn test_empty_order_still_has_password() {
        let config = SelectorConfig::default();
        assert_eq!(config.candidate_order(), vec![AuthMethod::Password]);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config {
            selector: SelectorConfig {
                method_timeout_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_token_section() {
        let config = Config {
            selector: SelectorConfig {
                method_order: vec![AuthMethod::Token],
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("token"));
    }

    #[test]
    fn test_validate_requires_ticket_section() {
        let config = Config {
            selector: SelectorConfig {
                method_order: vec![AuthMethod::Ticket],
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("ticket"));
    }

    #[test]
    fn test_method_timeout_default() {
        let config = SelectorConfig::default();
        assert_eq!(config.method_timeout(), Duration::from_secs(5));
    }
}
