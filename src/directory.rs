//! Local identity directory seam.
//!
//! The bridge never owns the local identity store; it consumes two
//! predicates from the database collaborator: "does local identity X
//! exist" and "does this username/password pair match the plain password
//! table". [`IdentityDirectory`] abstracts that seam;
//! [`StaticDirectory`] is the configuration-backed implementation used for
//! standalone deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::DirectoryConfig;
use crate::error::Result;

/// Trait for local identity lookups.
///
/// Implementations must be `Send + Sync`; the selector shares one
/// directory across all connection tasks. The trait is object-safe so that
/// `Arc<dyn IdentityDirectory>` can be used for runtime polymorphism.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Check whether a local identity exists.
    ///
    /// Called before any session is created, regardless of which method
    /// produced the identity.
    async fn identity_exists(&self, name: &str) -> Result<bool>;

    /// Verify a username/password pair against the plain password table.
    ///
    /// This is the legacy fallback path; it must keep working for every
    /// configuration.
    async fn verify_password(&self, name: &str, password: &str) -> Result<bool>;
}

/// Static identity directory loaded from configuration.
///
/// Holds a fixed name -> password table. Passwords are zeroized on drop
/// and compared in constant time.
///
/// # Example
///
/// ```
/// use dbauth_bridge::directory::StaticDirectory;
///
/// let directory = StaticDirectory::new().with_user("ALICE", "secret");
/// ```
pub struct StaticDirectory {
    /// Local identity name -> password (zeroized on drop).
    users: HashMap<String, Zeroizing<String>>,
}

impl StaticDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Create a directory from the configuration table.
    pub fn from_config(config: &DirectoryConfig) -> Self {
        let users = config
            .users
            .iter()
            .map(|(name, password)| (name.clone(), Zeroizing::new(password.clone())))
            .collect();
        Self { users }
    }

    /// Add a user (builder pattern).
    pub fn with_user(mut self, name: impl Into<String>, password: impl Into<String>) -> Self {
        self.users
            .insert(name.into(), Zeroizing::new(password.into()));
        self
    }
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self::new()
    }
}

// Custom Debug that never prints the password table
impl std::fmt::Debug for StaticDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticDirectory")
            .field("users", &self.users.len())
            .finish()
    }
}

#[async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn identity_exists(&self, name: &str) -> Result<bool> {
        Ok(self.users.contains_key(name))
    }

    async fn verify_password(&self, name: &str, password: &str) -> Result<bool> {
        match self.users.get(name) {
            Some(expected) => {
                let matches: bool = expected
                    .as_bytes()
                    .ct_eq(password.as_bytes())
                    .into();
                Ok(matches)
            }
            None => Ok(false),
        }
    }
}
