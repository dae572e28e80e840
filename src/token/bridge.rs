//! Token-exchange bridge against the external authorization server.

use std::collections::HashMap;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::{AuthToken, IntrospectionResponse, TokenResponse};
use crate::config::TokenConfig;
use crate::dispatch::OutboundGate;
use crate::error::{AuthError, Result};
use crate::secrets::{SecretKey, SecretStore};

/// Bridge to the external authorization server.
///
/// Performs the password-grant exchange, refresh-grant exchange, and
/// server-side introspection. The bridge authenticates itself with client
/// credentials obtained from the secret store (preferred) or static
/// configuration (fallback).
///
/// Password-grant is used rather than an authorization-code flow because
/// the client is a non-interactive wire-protocol connection that already
/// carries a username/password pair through the legacy handshake; the
/// bridge is transparent to it.
///
/// Stateless per attempt: no token is cached or retained here.
pub struct TokenBridge {
    http: reqwest::Client,
    config: TokenConfig,
    secrets: Arc<SecretStore>,
    gate: Arc<OutboundGate>,
}

impl TokenBridge {
    /// Create a bridge for the given endpoint configuration.
    pub fn new(
        config: TokenConfig,
        secrets: Arc<SecretStore>,
        gate: Arc<OutboundGate>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            secrets,
            gate,
        })
    }

    /// Exchange a username/password pair for a bearer token.
    ///
    /// Single password-grant round trip to the token endpoint.
    ///
    /// # Errors
    ///
    /// * [`AuthError::TokenExchange`] - Credentials rejected or server
    ///   unreachable
    /// * [`AuthError::BridgeMisconfigured`] - No client secret available
    pub async fn exchange(&self, username: &str, password: &str) -> Result<AuthToken> {
        let (client_id, client_secret) = self.client_credentials().await?;

        let mut params = HashMap::new();
        params.insert("grant_type", "password");
        params.insert("username", username);
        params.insert("password", password);
        params.insert("client_id", &client_id);
        params.insert("client_secret", &client_secret);

        let endpoint = self.config.token_endpoint.clone();
        let request = self.http.post(&endpoint).form(&params);

        let response = self
            .gate
            .run(async {
                request
                    .send()
                    .await
                    .map_err(|e| AuthError::TokenExchange(format!("request failed: {}", e)))
            })
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::TokenExchange(format!(
                "token endpoint returned HTTP {}",
                response.status()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("invalid token response: {}", e)))?;

        let token = AuthToken::from_response(token_response)?;
        debug!(username = %username, expires_at = %token.expires_at(), "Token exchange succeeded");
        Ok(token)
    }

    /// Check whether a token is currently active.
    ///
    /// Always asks the issuing server's introspection endpoint; the token
    /// is never verified locally. An inactive (expired/revoked) token is
    /// `Ok(false)`, not an error.
    ///
    /// # Errors
    ///
    /// * [`AuthError::TokenValidation`] - Transport or protocol failure
    ///   talking to the introspection endpoint
    pub async fn validate(&self, token: &AuthToken) -> Result<bool> {
        let (client_id, client_secret) = self.client_credentials().await?;

        let mut params = HashMap::new();
        params.insert("token", token.access_token());
        params.insert("client_id", client_id.as_str());
        params.insert("client_secret", client_secret.as_str());

        let endpoint = self.config.introspection_endpoint.clone();
        let request = self.http.post(&endpoint).form(&params);

        let response = self
            .gate
            .run(async {
                request
                    .send()
                    .await
                    .map_err(|e| AuthError::TokenValidation(format!("request failed: {}", e)))
            })
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::TokenValidation(format!(
                "introspection endpoint returned HTTP {}",
                response.status()
            )));
        }

        let introspection: IntrospectionResponse = response.json().await.map_err(|e| {
            AuthError::TokenValidation(format!("invalid introspection response: {}", e))
        })?;

        Ok(introspection.active)
    }

    /// Exchange a refresh token for a new bearer token.
    ///
    /// # Errors
    ///
    /// * [`AuthError::TokenRefresh`] - Refresh token invalid or expired;
    ///   the caller must re-run [`exchange`](Self::exchange)
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthToken> {
        let (client_id, client_secret) = self.client_credentials().await?;

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &client_id);
        params.insert("client_secret", &client_secret);

        let endpoint = self.config.token_endpoint.clone();
        let request = self.http.post(&endpoint).form(&params);

        let response = self
            .gate
            .run(async {
                request
                    .send()
                    .await
                    .map_err(|e| AuthError::TokenRefresh(format!("request failed: {}", e)))
            })
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::TokenRefresh(format!(
                "token endpoint returned HTTP {}",
                response.status()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenRefresh(format!("invalid refresh response: {}", e)))?;

        let token = AuthToken::from_response(token_response)?;
        debug!(expires_at = %token.expires_at(), "Token refresh succeeded");
        Ok(token)
    }

    /// Resolve the bridge's own client credentials.
    ///
    /// Tries the secret store first (`bridge/client-secret`), falling back
    /// to static configuration. Re-fetched on every call so a rotated
    /// client secret takes effect on the next authentication attempt.
    ///
    /// # Errors
    ///
    /// * [`AuthError::BridgeMisconfigured`] - Neither source provides a
    ///   secret
    pub async fn client_credentials(&self) -> Result<(String, Zeroizing<String>)> {
        match self.secrets.get(&SecretKey::bridge_client_secret()).await {
            Ok(record) => Ok((self.config.client_id.clone(), record.value)),
            Err(AuthError::SecretNotFound(_)) => match &self.config.client_secret {
                Some(secret) => Ok((
                    self.config.client_id.clone(),
                    Zeroizing::new(secret.clone()),
                )),
                None => Err(AuthError::BridgeMisconfigured(
                    "no client secret in vault or configuration".to_string(),
                )),
            },
            Err(e) => Err(e),
        }
    }
}
