//! Encrypted secret store (wallet).
//!
//! This module provides the encrypted-at-rest key-value store for
//! credentials: per-user passwords and the token bridge's own client
//! secret, both served by the same store and API under separate key
//! namespaces.
//!
//! # Overview
//!
//! - [`SecretKey`] - Namespaced key (`user-password/<name>` or the fixed
//!   `bridge/client-secret`)
//! - [`SecretRecord`] - Decrypted record with audit timestamps
//! - [`VaultBackend`] - Trait for the sealed storage layer
//! - [`MemoryVault`] - In-process backend with AES-256-CBC at rest
//! - [`SecretStore`] - The audited read/write surface
//!
//! # Security
//!
//! Values are encrypted at rest and decrypted only transiently into
//! [`zeroize::Zeroizing`] buffers. `accessed_at` is updated on every
//! successful read (audit requirement). Nothing is cached: a `set` takes
//! effect on the very next `get`.

mod store;
mod vault;

pub use store::SecretStore;
pub use vault::{MemoryVault, SealedSecret, VaultBackend, VaultCipher};

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

/// Namespace prefix for per-user passwords.
const USER_PASSWORD_PREFIX: &str = "user-password/";

/// Fixed key for the token bridge's own client secret.
const BRIDGE_CLIENT_SECRET_KEY: &str = "bridge/client-secret";

/// Secret classes stored in the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretType {
    /// A database user's password.
    UserPassword,
    /// The token bridge's OAuth client secret.
    ClientSecret,
}

/// Namespaced secret key.
///
/// One namespace per secret class: `user-password/<name>` (name
/// lowercased) for user passwords, and the fixed `bridge/client-secret`
/// for the token bridge's client secret.
///
/// # Example
///
/// ```
/// use dbauth_bridge::secrets::SecretKey;
///
/// let key = SecretKey::user_password("Alice");
/// assert_eq!(key.as_str(), "user-password/alice");
///
/// let key = SecretKey::bridge_client_secret();
/// assert_eq!(key.as_str(), "bridge/client-secret");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretKey(String);

impl SecretKey {
    /// Key for a user's password record.
    pub fn user_password(name: &str) -> Self {
        Self(format!("{}{}", USER_PASSWORD_PREFIX, name.to_lowercase()))
    }

    /// Key for the token bridge's client secret.
    pub fn bridge_client_secret() -> Self {
        Self(BRIDGE_CLIENT_SECRET_KEY.to_string())
    }

    /// The full namespaced key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The secret class this key belongs to.
    pub fn secret_type(&self) -> SecretType {
        if self.0.starts_with(USER_PASSWORD_PREFIX) {
            SecretType::UserPassword
        } else {
            SecretType::ClientSecret
        }
    }
}

impl std::fmt::Display for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decrypted secret record.
///
/// The value lives only in memory and is zeroized on drop; `accessed_at`
/// reflects the read that produced this record.
#[derive(Clone)]
pub struct SecretRecord {
    /// Namespaced key.
    pub key: SecretKey,

    /// Decrypted value (zeroized on drop).
    pub value: Zeroizing<String>,

    /// Secret class.
    pub secret_type: SecretType,

    /// When the record was first created.
    pub created_at: DateTime<Utc>,

    /// When the record was last rotated.
    pub updated_at: DateTime<Utc>,

    /// When the record was last read (including this read).
    pub accessed_at: Option<DateTime<Utc>>,
}

// Custom Debug implementation that redacts the decrypted value
impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRecord")
            .field("key", &self.key)
            .field("value", &"[REDACTED]")
            .field("secret_type", &self.secret_type)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("accessed_at", &self.accessed_at)
            .finish()
    }
}
