//! Sealed storage backends and the at-rest cipher.
//!
//! A [`VaultBackend`] stores [`SealedSecret`] records: ciphertext plus
//! metadata, never plaintext. [`VaultCipher`] does the AES-256-CBC
//! seal/open with a PBKDF2-HMAC-SHA256 derived key and a random IV per
//! record.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::SecretType;
use crate::error::{AuthError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// PBKDF2 iteration count for master-key derivation.
const KDF_ROUNDS: u32 = 100_000;

/// Salt context for master-key derivation.
///
/// The vault is in-process, so a fixed salt keeps derivation deterministic
/// across the lifetime of a passphrase without persisting salt material.
const KDF_SALT: &[u8] = b"dbauth-bridge/vault/v1";

/// An encrypted record as held by a backend.
#[derive(Debug, Clone)]
pub struct SealedSecret {
    /// AES-256-CBC ciphertext of the secret value.
    pub ciphertext: Vec<u8>,

    /// Per-record initialization vector.
    pub iv: [u8; 16],

    /// Secret class.
    pub secret_type: SecretType,

    /// When the record was first created.
    pub created_at: DateTime<Utc>,

    /// When the record was last rotated.
    pub updated_at: DateTime<Utc>,

    /// When the record was last read.
    pub accessed_at: Option<DateTime<Utc>>,
}

/// Trait for sealed storage layers.
///
/// Backends only ever see ciphertext. All implementations must be
/// `Send + Sync`; the store is shared across connection tasks.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// Fetch a sealed record by its full namespaced key.
    async fn fetch(&self, key: &str) -> Result<Option<SealedSecret>>;

    /// Store (insert or replace) a sealed record.
    async fn store(&self, key: &str, sealed: SealedSecret) -> Result<()>;
}

/// In-process vault backend.
///
/// Keeps sealed records in a concurrent map. Secrets do not survive a
/// process restart; production deployments put an external vault behind
/// the same trait.
pub struct MemoryVault {
    entries: DashMap<String, SealedSecret>,
}

impl MemoryVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the vault is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VaultBackend for MemoryVault {
    async fn fetch(&self, key: &str) -> Result<Option<SealedSecret>> {
        Ok(self.entries.get(key).map(|entry| entry.clone()))
    }

    async fn store(&self, key: &str, sealed: SealedSecret) -> Result<()> {
        self.entries.insert(key.to_string(), sealed);
        Ok(())
    }
}

/// At-rest cipher for secret values.
///
/// Key material is derived once from a passphrase (or generated randomly
/// when no passphrase is configured) and zeroized on drop.
pub struct VaultCipher {
    key: [u8; 32],
}

impl VaultCipher {
    /// Derive a cipher from a master passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), KDF_SALT, KDF_ROUNDS, &mut key);
        Self { key }
    }

    /// Create a cipher with a random key.
    ///
    /// Secrets sealed with a random key are unreadable after restart;
    /// acceptable for the in-memory vault.
    pub fn random() -> Self {
        Self {
            key: rand::random(),
        }
    }

    /// Encrypt a plaintext value into ciphertext and a fresh IV.
    pub fn seal(&self, plaintext: &str) -> (Vec<u8>, [u8; 16]) {
        let iv: [u8; 16] = rand::random();
        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        (ciphertext, iv)
    }

    /// Decrypt a sealed value into a transient zeroizing buffer.
    pub fn open(&self, ciphertext: &[u8], iv: &[u8; 16]) -> Result<Zeroizing<String>> {
        let mut plaintext = Aes256CbcDec::new(&self.key.into(), &(*iv).into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| AuthError::Config("vault record failed to decrypt".to_string()))?;

        match String::from_utf8(plaintext.clone()) {
            Ok(value) => {
                plaintext.zeroize();
                Ok(Zeroizing::new(value))
            }
            Err(_) => {
                plaintext.zeroize();
                Err(AuthError::Config(
                    "vault record is not valid UTF-8".to_string(),
                ))
            }
        }
    }
}

impl Drop for VaultCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

// Key material never appears in debug output
impl std::fmt::Debug for VaultCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
