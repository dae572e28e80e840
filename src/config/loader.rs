//! Configuration loader.

use std::path::Path;

use super::Config;
use crate::error::{AuthError, Result};

/// Load configuration from a YAML file.
///
/// Also applies DBAUTH_BRIDGE_* env var overrides after loading.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// Also applies DBAUTH_BRIDGE_* env var overrides after loading.
pub fn load_config_from_str(yaml: &str) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(yaml)?;
    apply_env_overrides(&mut config);
    config.validate().map_err(AuthError::Config)?;
    Ok(config)
}

/// Apply DBAUTH_BRIDGE_* environment variable overrides to a config.
///
/// Any set env var overrides the corresponding config value.
///
/// Supported env vars:
/// - `DBAUTH_BRIDGE_LOG_LEVEL` - Override log level
/// - `DBAUTH_BRIDGE_METHOD_TIMEOUT_SECS` - Override per-method timeout
/// - `DBAUTH_BRIDGE_TOKEN_ENDPOINT` - Override token endpoint
/// - `DBAUTH_BRIDGE_INTROSPECTION_ENDPOINT` - Override introspection endpoint
/// - `DBAUTH_BRIDGE_CLIENT_ID` - Override token bridge client id
/// - `DBAUTH_BRIDGE_CLIENT_SECRET` - Override static client secret fallback
/// - `DBAUTH_BRIDGE_MASTER_KEY` - Override vault master key passphrase
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("DBAUTH_BRIDGE_LOG_LEVEL") {
        debug!("Overriding log level from DBAUTH_BRIDGE_LOG_LEVEL");
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var("DBAUTH_BRIDGE_METHOD_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse::<u64>() {
            debug!("Overriding method timeout from DBAUTH_BRIDGE_METHOD_TIMEOUT_SECS");
            config.selector.method_timeout_secs = secs;
        }
    }
    if let Ok(val) = std::env::var("DBAUTH_BRIDGE_TOKEN_ENDPOINT") {
        if let Some(ref mut token) = config.token {
            debug!("Overriding token endpoint from DBAUTH_BRIDGE_TOKEN_ENDPOINT");
            token.token_endpoint = val;
        }
    }
    if let Ok(val) = std::env::var("DBAUTH_BRIDGE_INTROSPECTION_ENDPOINT") {
        if let Some(ref mut token) = config.token {
            debug!("Overriding introspection endpoint from DBAUTH_BRIDGE_INTROSPECTION_ENDPOINT");
            token.introspection_endpoint = val;
        }
    }
    if let Ok(val) = std::env::var("DBAUTH_BRIDGE_CLIENT_ID") {
        if let Some(ref mut token) = config.token {
            debug!("Overriding client id from DBAUTH_BRIDGE_CLIENT_ID");
            token.client_id = val;
        }
    }
    if let Ok(val) = std::env::var("DBAUTH_BRIDGE_CLIENT_SECRET") {
        if let Some(ref mut token) = config.token {
            debug!("Overriding client secret from DBAUTH_BRIDGE_CLIENT_SECRET");
            token.client_secret = Some(val);
        }
    }
    if let Ok(val) = std::env::var("DBAUTH_BRIDGE_MASTER_KEY") {
        debug!("Overriding master key from DBAUTH_BRIDGE_MASTER_KEY");
        config.secret_store.master_key = Some(val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::AuthMethod;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str("{}").unwrap();
        assert!(config.selector.method_order.is_empty());
        assert_eq!(config.selector.method_timeout_secs, 5);
    }

    #[test]
    fn test_load_full_config() {
        let yaml = r#"
selector:
  method_order: [ticket, token, secret_store]
  method_timeout_secs: 3

token:
  token_endpoint: "https://issuer.example.com/oauth/token"
  introspection_endpoint: "https://issuer.example.com/oauth/introspect"
  client_id: "db-gateway"
  client_secret: "static-secret"

ticket:
  service_name: "dbgate/gateway.example.com"
  credential_store: "/etc/dbgate/service.keytab"

directory:
  users:
    ALICE: "alice-password"

logging:
  level: "debug"
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(
            config.selector.method_order,
            vec![
                AuthMethod::Ticket,
                AuthMethod::Token,
                AuthMethod::SecretStore
            ]
        );
        assert_eq!(config.selector.method_timeout_secs, 3);

        let token = config.token.unwrap();
        assert_eq!(token.client_id, "db-gateway");
        assert_eq!(token.client_secret.as_deref(), Some("static-secret"));

        let ticket = config.ticket.unwrap();
        assert_eq!(ticket.service_name, "dbgate/gateway.example.com");

        assert_eq!(
            config.directory.users.get("ALICE").map(String::as_str),
            Some("alice-password")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_rejects_unknown_method() {
        let yaml = r#"
selector:
  method_order: [certificate]
"#;
        assert!(load_config_from_str(yaml).is_err());
    }

    #[test]
    fn test_load_rejects_enabled_method_without_section() {
        let yaml = r#"
selector:
  method_order: [token]
"#;
        assert!(load_config_from_str(yaml).is_err());
    }
}
