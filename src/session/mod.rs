//! Authenticated session state.
//!
//! A [`Session`] is created once a connection has authenticated and lives
//! until the connection closes. The [`registry`](crate::session::SessionRegistry)
//! tracks all live sessions for operational visibility.

mod registry;

pub use registry::SessionRegistry;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::method::AuthMethod;
use crate::secrets::SecretKey;
use crate::ticket::ForeignIdentity;
use crate::token::AuthToken;

/// The credential an authenticated session holds.
///
/// Exactly one credential per session, fixed by the variant: a session
/// can never carry both a token and a ticket identity.
#[derive(Debug, Clone)]
pub enum CredentialRef {
    /// Password-verified; no retained credential material.
    Password,

    /// Bearer token from the authorization server.
    Token(AuthToken),

    /// Foreign identity from a completed ticket handshake.
    Ticket(ForeignIdentity),

    /// Key of the vault secret that authenticated the session.
    Secret(SecretKey),
}

impl CredentialRef {
    /// The method that produced this credential.
    pub fn method(&self) -> AuthMethod {
        match self {
            CredentialRef::Password => AuthMethod::Password,
            CredentialRef::Token(_) => AuthMethod::Token,
            CredentialRef::Ticket(_) => AuthMethod::Ticket,
            CredentialRef::Secret(_) => AuthMethod::SecretStore,
        }
    }
}

/// One authenticated connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session identifier.
    pub session_id: Uuid,

    /// Local identity the connection authenticated as.
    pub local_identity: String,

    /// Method that won the selection run.
    pub auth_method: AuthMethod,

    /// Credential backing the session.
    pub credential: CredentialRef,

    /// When the session was established.
    pub created_at: DateTime<Utc>,

    /// Last observed activity on the connection.
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for a freshly authenticated connection.
    ///
    /// The method is derived from the credential, keeping the two fields
    /// consistent by construction.
    pub fn new(local_identity: String, credential: CredentialRef) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            local_identity,
            auth_method: credential.method(),
            credential,
            created_at: now,
            last_activity_at: now,
        }
    }
}
