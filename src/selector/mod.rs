//! Multi-method authentication selection.
//!
//! The selector runs the configured authentication methods in priority
//! order against a single connecting client, falling through on
//! method-local failures until one method succeeds or every candidate,
//! including the mandatory password fallback, has been tried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::audit::{AuditEvent, AuditLog, AuditOutcome};
use crate::config::SelectorConfig;
use crate::directory::IdentityDirectory;
use crate::dispatch::OutboundGate;
use crate::error::{AuthError, Result};
use crate::method::AuthMethod;
use crate::secrets::{SecretKey, SecretStore};
use crate::session::{CredentialRef, Session, SessionRegistry};
use crate::ticket::{map_principal, TicketBridge};
use crate::token::TokenBridge;

/// Capacity of the per-connection ticket relay channels.
const EXCHANGE_CHANNEL_CAPACITY: usize = 8;

/// Capability hints announced by the client during the initial handshake.
///
/// Wire drivers set free-form key-value parameters; the selector only
/// interprets the ones it knows about.
#[derive(Debug, Clone, Default)]
pub struct ClientHints {
    params: HashMap<String, String>,
}

impl ClientHints {
    /// Build hints from the client's startup parameters.
    pub fn from_params(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Build hints with a single boolean flag set (convenience for tests
    /// and simple drivers).
    pub fn with_flag(flag: &str) -> Self {
        let mut params = HashMap::new();
        params.insert(flag.to_string(), "true".to_string());
        Self { params }
    }

    /// Whether the client announced support for the multi-round-trip
    /// ticket negotiation.
    ///
    /// Clients that stay silent are assumed incapable: offering them a
    /// negotiation they cannot answer would burn the whole ticket deadline
    /// on every connection.
    pub fn ticket_capable(&self) -> bool {
        match self.params.get("auth_negotiate") {
            Some(value) => !matches!(value.as_str(), "false" | "0"),
            None => false,
        }
    }

    /// Raw parameter lookup for driver-specific keys.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// One connecting client's side of the authentication conversation.
///
/// Carries the startup credentials plus the duplex channel pair the
/// ticket negotiation uses: the wire driver feeds client ticket blobs in
/// and relays continuation blobs back out.
pub struct ClientExchange {
    /// Username from the startup message.
    pub username: String,

    /// Password from the startup message, if the client sent one
    /// (zeroized on drop).
    pub password: Option<Zeroizing<String>>,

    /// Capability hints from the startup message.
    pub hints: ClientHints,

    ticket_rx: mpsc::Receiver<Vec<u8>>,
    continuation_tx: mpsc::Sender<Vec<u8>>,
}

impl ClientExchange {
    /// Create an exchange plus the wire driver's ends of the ticket relay.
    ///
    /// Returns the exchange, the sender the driver pushes client ticket
    /// blobs into, and the receiver it drains continuation blobs from.
    pub fn with_channels(
        username: String,
        password: Option<Zeroizing<String>>,
        hints: ClientHints,
    ) -> (Self, mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>) {
        let (ticket_tx, ticket_rx) = mpsc::channel(EXCHANGE_CHANNEL_CAPACITY);
        let (continuation_tx, continuation_rx) = mpsc::channel(EXCHANGE_CHANNEL_CAPACITY);

        let exchange = Self {
            username,
            password,
            hints,
            ticket_rx,
            continuation_tx,
        };
        (exchange, ticket_tx, continuation_rx)
    }

    /// Receive the next ticket blob from the client.
    ///
    /// `None` means the client side of the exchange was dropped.
    pub async fn recv_ticket(&mut self) -> Option<Vec<u8>> {
        self.ticket_rx.recv().await
    }

    /// Relay a continuation blob back to the client.
    pub async fn send_continuation(&self, blob: Vec<u8>) -> Result<()> {
        self.continuation_tx.send(blob).await.map_err(|_| {
            AuthError::TicketHandshake("client closed the exchange mid-negotiation".to_string())
        })
    }
}

// Password never appears in debug output
impl std::fmt::Debug for ClientExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientExchange")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("hints", &self.hints)
            .finish()
    }
}

/// Normalize a client-supplied username for directory lookup.
///
/// Case folding only. Realm stripping is reserved for ticket principals;
/// a legacy username containing `@` is looked up verbatim.
fn local_username(username: &str) -> String {
    username.to_uppercase()
}

/// Order the candidate methods for one connection.
///
/// Starts from the configured order (which already carries the password
/// fallback last) and applies the client's capability hints: the ticket
/// method is dropped entirely for clients that did not announce
/// negotiation support, and promoted to the front for clients that did.
pub fn order_candidates(configured: &[AuthMethod], hints: &ClientHints) -> Vec<AuthMethod> {
    let mut ordered: Vec<AuthMethod> = Vec::with_capacity(configured.len());

    if hints.ticket_capable() && configured.contains(&AuthMethod::Ticket) {
        ordered.push(AuthMethod::Ticket);
    }
    for method in configured {
        if *method != AuthMethod::Ticket && !ordered.contains(method) {
            ordered.push(*method);
        }
    }
    ordered
}

/// Runs the configured authentication methods against one connection.
///
/// Construction follows the builder pattern: the password fallback works
/// with nothing but a directory, and the enterprise bridges are attached
/// with `with_*` when their configuration sections are present.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use dbauth_bridge::audit::AuditLog;
/// use dbauth_bridge::config::SelectorConfig;
/// use dbauth_bridge::directory::StaticDirectory;
/// use dbauth_bridge::dispatch::OutboundGate;
/// use dbauth_bridge::secrets::{MemoryVault, SecretStore, VaultCipher};
/// use dbauth_bridge::selector::AuthenticationSelector;
/// use dbauth_bridge::session::SessionRegistry;
///
/// let selector = AuthenticationSelector::new(
///     SelectorConfig::default(),
///     Arc::new(StaticDirectory::new().with_user("ALICE", "secret")),
///     Arc::new(SecretStore::new(
///         Arc::new(MemoryVault::new()),
///         VaultCipher::random(),
///     )),
///     Arc::new(SessionRegistry::new()),
///     AuditLog::new(),
///     Arc::new(OutboundGate::new(16)),
/// );
/// ```
pub struct AuthenticationSelector {
    config: SelectorConfig,
    directory: Arc<dyn IdentityDirectory>,
    secrets: Arc<SecretStore>,
    sessions: Arc<SessionRegistry>,
    audit: AuditLog,
    gate: Arc<OutboundGate>,
    token: Option<Arc<TokenBridge>>,
    ticket: Option<Arc<TicketBridge>>,
}

impl AuthenticationSelector {
    /// Create a selector with only the password fallback wired up.
    ///
    /// Directory and secret-store lookups run under the outbound gate;
    /// the same gate is normally shared with the token and ticket bridges.
    pub fn new(
        config: SelectorConfig,
        directory: Arc<dyn IdentityDirectory>,
        secrets: Arc<SecretStore>,
        sessions: Arc<SessionRegistry>,
        audit: AuditLog,
        gate: Arc<OutboundGate>,
    ) -> Self {
        Self {
            config,
            directory,
            secrets,
            sessions,
            audit,
            gate,
            token: None,
            ticket: None,
        }
    }

    /// Attach the token bridge (builder pattern).
    pub fn with_token_bridge(mut self, bridge: Arc<TokenBridge>) -> Self {
        self.token = Some(bridge);
        self
    }

    /// Attach the ticket bridge (builder pattern).
    pub fn with_ticket_bridge(mut self, bridge: Arc<TicketBridge>) -> Self {
        self.ticket = Some(bridge);
        self
    }

    /// Authenticate one connection.
    ///
    /// Tries each candidate method in order. A method-local failure or
    /// per-method timeout moves on to the next candidate; any other error
    /// aborts immediately. Every attempt and the terminal outcome are
    /// written to the audit log.
    ///
    /// # Errors
    ///
    /// * [`AuthError::AuthExhausted`] - Every candidate failed, including
    ///   the password fallback
    pub async fn authenticate(&self, exchange: &mut ClientExchange) -> Result<Session> {
        let connection_id = Uuid::new_v4();
        let run_started = Instant::now();
        let candidates = order_candidates(&self.config.candidate_order(), &exchange.hints);

        info!(
            connection_id = %connection_id,
            username = %exchange.username,
            candidates = ?candidates.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
            "Starting authentication"
        );

        for method in candidates {
            let started = Instant::now();
            let outcome = self.attempt(method, exchange).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok((local_identity, credential)) => {
                    self.record(
                        connection_id,
                        Some(method),
                        AuditOutcome::Success,
                        elapsed,
                        Some(local_identity.clone()),
                    );
                    // Run-level terminal record for the whole pass.
                    self.record(
                        connection_id,
                        None,
                        AuditOutcome::Success,
                        run_started.elapsed(),
                        Some(local_identity.clone()),
                    );

                    let session = Session::new(local_identity, credential);
                    self.sessions.register(session.clone());
                    return Ok(session);
                }
                Err(e) if e.is_method_local() => {
                    let outcome = if e.is_timeout() {
                        AuditOutcome::Timeout
                    } else {
                        AuditOutcome::Failure(e.to_string())
                    };
                    self.record(connection_id, Some(method), outcome, elapsed, None);
                    // A misconfigured bridge is an operator problem, not a
                    // bad credential; surface it above debug.
                    if matches!(e, AuthError::BridgeMisconfigured(_)) {
                        warn!(
                            connection_id = %connection_id,
                            method = %method,
                            error = %e,
                            "Method misconfigured, trying next candidate"
                        );
                    } else {
                        debug!(
                            connection_id = %connection_id,
                            method = %method,
                            error = %e,
                            "Method failed, trying next candidate"
                        );
                    }
                }
                Err(e) => {
                    self.record(
                        connection_id,
                        Some(method),
                        AuditOutcome::Failure(e.to_string()),
                        elapsed,
                        None,
                    );
                    self.record(
                        connection_id,
                        None,
                        AuditOutcome::Failure(e.to_string()),
                        run_started.elapsed(),
                        None,
                    );
                    error!(
                        connection_id = %connection_id,
                        method = %method,
                        error = %e,
                        "Authentication aborted"
                    );
                    return Err(e);
                }
            }
        }

        self.record(
            connection_id,
            None,
            AuditOutcome::Failure("all methods exhausted".to_string()),
            run_started.elapsed(),
            None,
        );
        warn!(connection_id = %connection_id, "Authentication exhausted");
        Err(AuthError::AuthExhausted)
    }

    /// Run one method attempt, returning the local identity and the
    /// credential it produced.
    ///
    /// The ticket method enforces its own cumulative deadline internally;
    /// every other method races the uniform per-method timeout here.
    async fn attempt(
        &self,
        method: AuthMethod,
        exchange: &mut ClientExchange,
    ) -> Result<(String, CredentialRef)> {
        match method {
            AuthMethod::Ticket => self.attempt_ticket(exchange).await,
            _ => {
                let timeout = self.config.method_timeout();
                let attempt = async {
                    match method {
                        AuthMethod::Password => self.attempt_password(exchange).await,
                        AuthMethod::Token => self.attempt_token(exchange).await,
                        AuthMethod::SecretStore => self.attempt_secret(exchange).await,
                        AuthMethod::Ticket => unreachable!(),
                    }
                };
                match tokio::time::timeout(timeout, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(AuthError::MethodTimeout(timeout)),
                }
            }
        }
    }

    async fn attempt_password(
        &self,
        exchange: &ClientExchange,
    ) -> Result<(String, CredentialRef)> {
        let password = exchange
            .password
            .as_ref()
            .ok_or_else(|| AuthError::Directory("no password presented".to_string()))?;

        let local_identity = local_username(&exchange.username);
        let verified = self
            .gate
            .run(self.directory.verify_password(&local_identity, password))
            .await?;
        if !verified {
            return Err(AuthError::Directory("password rejected".to_string()));
        }

        Ok((local_identity, CredentialRef::Password))
    }

    async fn attempt_token(&self, exchange: &ClientExchange) -> Result<(String, CredentialRef)> {
        let bridge = self
            .token
            .as_ref()
            .ok_or_else(|| AuthError::BridgeMisconfigured("token bridge not attached".to_string()))?;
        let password = exchange
            .password
            .as_ref()
            .ok_or_else(|| AuthError::TokenExchange("no password to exchange".to_string()))?;

        let token = bridge.exchange(&exchange.username, password).await?;

        let local_identity = local_username(&exchange.username);
        self.require_identity(&local_identity).await?;
        Ok((local_identity, CredentialRef::Token(token)))
    }

    async fn attempt_ticket(
        &self,
        exchange: &mut ClientExchange,
    ) -> Result<(String, CredentialRef)> {
        let bridge = self.ticket.as_ref().ok_or_else(|| {
            AuthError::BridgeMisconfigured("ticket bridge not attached".to_string())
        })?;

        let identity = bridge.authenticate(exchange).await?;

        let local_identity = map_principal(&identity.principal);
        self.require_identity(&local_identity).await?;
        Ok((local_identity, CredentialRef::Ticket(identity)))
    }

    async fn attempt_secret(&self, exchange: &ClientExchange) -> Result<(String, CredentialRef)> {
        let password = exchange
            .password
            .as_ref()
            .ok_or_else(|| AuthError::Directory("no password presented".to_string()))?;

        let key = SecretKey::user_password(&exchange.username);
        let record = self.gate.run(self.secrets.get(&key)).await?;

        use subtle::ConstantTimeEq;
        let matches: bool = record
            .value
            .as_bytes()
            .ct_eq(password.as_bytes())
            .into();
        if !matches {
            return Err(AuthError::Directory("vault secret rejected".to_string()));
        }

        let local_identity = local_username(&exchange.username);
        self.require_identity(&local_identity).await?;
        Ok((local_identity, CredentialRef::Secret(key)))
    }

    /// Reject identities with no local counterpart before any session is
    /// created.
    async fn require_identity(&self, local_identity: &str) -> Result<()> {
        if self
            .gate
            .run(self.directory.identity_exists(local_identity))
            .await?
        {
            Ok(())
        } else {
            Err(AuthError::PrincipalNotMapped(local_identity.to_string()))
        }
    }

    fn record(
        &self,
        connection_id: Uuid,
        method: Option<AuthMethod>,
        outcome: AuditOutcome,
        elapsed: std::time::Duration,
        local_identity: Option<String>,
    ) {
        self.audit.record(AuditEvent {
            connection_id,
            method,
            outcome,
            elapsed,
            local_identity,
            at: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(methods: &[AuthMethod]) -> Vec<AuthMethod> {
        let mut ordered = methods.to_vec();
        ordered.push(AuthMethod::Password);
        ordered
    }

    #[test]
    fn test_silent_client_skips_ticket() {
        let ordered = order_candidates(
            &configured(&[AuthMethod::Ticket, AuthMethod::Token]),
            &ClientHints::default(),
        );
        assert_eq!(ordered, vec![AuthMethod::Token, AuthMethod::Password]);
    }

    #[test]
    fn test_capable_client_fronts_ticket() {
        let ordered = order_candidates(
            &configured(&[AuthMethod::Token, AuthMethod::Ticket]),
            &ClientHints::with_flag("auth_negotiate"),
        );
        assert_eq!(
            ordered,
            vec![AuthMethod::Ticket, AuthMethod::Token, AuthMethod::Password]
        );
    }

    #[test]
    fn test_capable_client_without_configured_ticket() {
        // A capability hint never enables a method the operator left out.
        let ordered = order_candidates(
            &configured(&[AuthMethod::Token]),
            &ClientHints::with_flag("auth_negotiate"),
        );
        assert_eq!(ordered, vec![AuthMethod::Token, AuthMethod::Password]);
    }

    #[test]
    fn test_password_always_survives_ordering() {
        let ordered = order_candidates(&configured(&[]), &ClientHints::default());
        assert_eq!(ordered, vec![AuthMethod::Password]);
    }

    #[test]
    fn test_hint_flag_parsing() {
        assert!(ClientHints::with_flag("auth_negotiate").ticket_capable());
        assert!(!ClientHints::default().ticket_capable());

        let mut params = HashMap::new();
        params.insert("auth_negotiate".to_string(), "false".to_string());
        assert!(!ClientHints::from_params(params).ticket_capable());

        let mut params = HashMap::new();
        params.insert("auth_negotiate".to_string(), "1".to_string());
        assert!(ClientHints::from_params(params).ticket_capable());
    }

    #[test]
    fn test_local_username_preserves_at_sign() {
        assert_eq!(local_username("alice"), "ALICE");
        assert_eq!(local_username("eve@legacy"), "EVE@LEGACY");
    }

    #[test]
    fn test_exchange_debug_redacts_password() {
        let (exchange, _tx, _rx) = ClientExchange::with_channels(
            "alice".to_string(),
            Some(Zeroizing::new("hunter2".to_string())),
            ClientHints::default(),
        );
        let debug_output = format!("{:?}", exchange);
        assert!(!debug_output.contains("hunter2"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
