//! dbauth-bridge - Multi-method authentication bridge for database gateways
//!
//! This library provides the authentication layer of a database gateway:
//! - Runs configured authentication methods in priority order with a
//!   mandatory password fallback via the [`selector`] module
//! - Bridges bearer-token exchange and introspection to an external
//!   authorization server via the [`token`] module
//! - Drives multi-round-trip ticket/SSO negotiations via the [`ticket`]
//!   module
//! - Stores credentials encrypted at rest via the [`secrets`] module
//! - Tracks authenticated sessions and writes an audit trail

#[macro_use]
mod logging;

pub mod audit;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod method;
pub mod secrets;
pub mod selector;
pub mod session;
pub mod ticket;
pub mod token;

pub use audit::{AuditEvent, AuditLog, AuditOutcome};
pub use config::Config;
pub use directory::{IdentityDirectory, StaticDirectory};
pub use error::{AuthError, Result};
pub use method::AuthMethod;
pub use secrets::{SecretKey, SecretStore};
pub use selector::{AuthenticationSelector, ClientExchange, ClientHints};
pub use session::{CredentialRef, Session, SessionRegistry};
pub use ticket::{ForeignIdentity, TicketBridge};
pub use token::{AuthToken, TokenBridge};
