//! Audited secret store surface.

use std::sync::Arc;

use chrono::Utc;

use super::vault::{SealedSecret, VaultBackend, VaultCipher};
use super::{SecretKey, SecretRecord};
use crate::error::{AuthError, Result};

/// Encrypted, audited secret store.
///
/// Wraps a [`VaultBackend`] with the at-rest cipher and the audit
/// bookkeeping the bridge requires: every successful `get` updates
/// `accessed_at`, and nothing is cached, so a `set` (rotation) takes effect
/// on the very next read, with no restart or invalidation step.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use dbauth_bridge::secrets::{MemoryVault, SecretKey, SecretStore, VaultCipher};
///
/// # async fn demo() -> dbauth_bridge::Result<()> {
/// let store = SecretStore::new(
///     Arc::new(MemoryVault::new()),
///     VaultCipher::from_passphrase("master"),
/// );
///
/// let key = SecretKey::user_password("alice");
/// store.set(&key, "first-password").await?;
///
/// let record = store.get(&key).await?;
/// assert_eq!(record.value.as_str(), "first-password");
/// # Ok(())
/// # }
/// ```
pub struct SecretStore {
    backend: Arc<dyn VaultBackend>,
    cipher: VaultCipher,
}

impl SecretStore {
    /// Create a store over the given backend and cipher.
    pub fn new(backend: Arc<dyn VaultBackend>, cipher: VaultCipher) -> Self {
        Self { backend, cipher }
    }

    /// Retrieve and decrypt a secret.
    ///
    /// Updates `accessed_at` on the stored record (audit requirement)
    /// before returning. Always hits the backend; nothing is cached past a
    /// single call.
    ///
    /// # Errors
    ///
    /// * [`AuthError::SecretNotFound`] - No record under this key. This is
    ///   a recoverable signal; callers fall back to the plain password
    ///   table.
    pub async fn get(&self, key: &SecretKey) -> Result<SecretRecord> {
        let mut sealed = self
            .backend
            .fetch(key.as_str())
            .await?
            .ok_or_else(|| AuthError::SecretNotFound(key.to_string()))?;

        let value = self.cipher.open(&sealed.ciphertext, &sealed.iv)?;

        let accessed_at = Utc::now();
        sealed.accessed_at = Some(accessed_at);

        let record = SecretRecord {
            key: key.clone(),
            value,
            secret_type: sealed.secret_type,
            created_at: sealed.created_at,
            updated_at: sealed.updated_at,
            accessed_at: Some(accessed_at),
        };

        self.backend.store(key.as_str(), sealed).await?;
        trace!(key = %key, "Secret read");

        Ok(record)
    }

    /// Store (create or rotate) a secret.
    ///
    /// Administrative operation. Preserves `created_at` for existing
    /// records and bumps `updated_at`. Effective immediately: the next
    /// `get` observes the new value.
    pub async fn set(&self, key: &SecretKey, value: &str) -> Result<()> {
        let now = Utc::now();
        let existing = self.backend.fetch(key.as_str()).await?;

        let (ciphertext, iv) = self.cipher.seal(value);
        let sealed = SealedSecret {
            ciphertext,
            iv,
            secret_type: key.secret_type(),
            created_at: existing.as_ref().map_or(now, |prev| prev.created_at),
            updated_at: now,
            accessed_at: existing.and_then(|prev| prev.accessed_at),
        };

        self.backend.store(key.as_str(), sealed).await?;
        debug!(key = %key, "Secret stored");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{MemoryVault, SecretType};

    fn store() -> SecretStore {
        SecretStore::new(
            Arc::new(MemoryVault::new()),
            VaultCipher::from_passphrase("test-master"),
        )
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = store();
        let key = SecretKey::user_password("alice");

        store.set(&key, "alice-password").await.unwrap();

        let record = store.get(&key).await.unwrap();
        assert_eq!(record.value.as_str(), "alice-password");
        assert_eq!(record.secret_type, SecretType::UserPassword);
        assert!(record.accessed_at.is_some());
    }

    #[tokio::test]
    async fn test_get_missing_is_secret_not_found() {
        let store = store();
        let key = SecretKey::user_password("nobody");

        let err = store.get(&key).await.unwrap_err();
        assert!(matches!(err, AuthError::SecretNotFound(_)));
        assert!(err.is_method_local());
    }

    #[tokio::test]
    async fn test_rotation_is_immediate() {
        let store = store();
        let key = SecretKey::user_password("alice");

        store.set(&key, "first").await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().value.as_str(), "first");

        // Rotation: the very next get must observe the new value.
        store.set(&key, "second").await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().value.as_str(), "second");
    }

    #[tokio::test]
    async fn test_rotation_preserves_created_at() {
        let store = store();
        let key = SecretKey::bridge_client_secret();

        store.set(&key, "v1").await.unwrap();
        let first = store.get(&key).await.unwrap();

        store.set(&key, "v2").await.unwrap();
        let second = store.get(&key).await.unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_accessed_at_advances_per_read() {
        let store = store();
        let key = SecretKey::user_password("alice");
        store.set(&key, "pw").await.unwrap();

        let first = store.get(&key).await.unwrap();
        let second = store.get(&key).await.unwrap();

        assert!(second.accessed_at.unwrap() >= first.accessed_at.unwrap());
    }

    #[tokio::test]
    async fn test_namespaces_are_disjoint() {
        let store = store();

        store
            .set(&SecretKey::user_password("alice"), "user-pw")
            .await
            .unwrap();
        store
            .set(&SecretKey::bridge_client_secret(), "client-secret")
            .await
            .unwrap();

        let user = store.get(&SecretKey::user_password("alice")).await.unwrap();
        let client = store.get(&SecretKey::bridge_client_secret()).await.unwrap();

        assert_eq!(user.value.as_str(), "user-pw");
        assert_eq!(client.value.as_str(), "client-secret");
        assert_eq!(client.secret_type, SecretType::ClientSecret);
    }
}
