//! Ticket-based security-context establishment.
//!
//! Unlike the single-round-trip token exchange, a ticket handshake is a
//! multi-step negotiation: the client presents an opaque ticket, the
//! external ticket backend may answer with a continuation blob that must
//! be relayed back to the client, and the loop repeats until the backend
//! declares the context complete. [`TicketBridge`] drives that loop;
//! [`map_principal`] turns the resulting foreign principal into a local
//! identity.

mod bridge;

pub use bridge::TicketBridge;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// An authenticated foreign identity produced by a completed handshake.
///
/// The principal is in the backend's own naming scheme, e.g.
/// `alice@EXAMPLE.COM`, and has not yet been mapped to a local identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignIdentity {
    /// Principal name as reported by the ticket backend.
    pub principal: String,

    /// When the handshake completed locally.
    pub authenticated_at: DateTime<Utc>,

    /// Expiry of the underlying ticket, when the backend reports one.
    pub ticket_expiry: Option<DateTime<Utc>>,
}

/// Handshake progress, advanced one step per client round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketState {
    /// Waiting for the client's initial ticket.
    AwaitingTicket,

    /// Mid-negotiation; `rounds` backend steps have completed.
    ContextStep { rounds: u32 },

    /// Security context established.
    Complete,

    /// Negotiation failed; the context cannot be recovered.
    Failed,
}

/// Outcome of a single backend step.
#[derive(Debug, Clone)]
pub struct ContextStep {
    /// Opaque blob to relay to the client, if the backend produced one.
    pub continuation: Option<Vec<u8>>,

    /// Whether the security context is now established.
    pub complete: bool,

    /// Principal name, present once `complete` is true.
    pub principal: Option<String>,

    /// Expiry of the presented ticket, if the backend reports one.
    pub ticket_expiry: Option<DateTime<Utc>>,
}

/// Trait for the external ticket backend.
///
/// One `step` call per client round trip. Implementations wrap whatever
/// mechanism actually verifies the ticket; tests substitute scripted
/// authorities.
#[async_trait]
pub trait TicketAuthority: Send + Sync {
    /// Feed one client-supplied blob into the negotiation.
    async fn step(&self, service: &str, input: &[u8]) -> Result<ContextStep>;
}

/// Map a foreign principal to a local identity name.
///
/// Strips the realm qualifier (everything from the first `@`) and
/// uppercases the remainder, matching how the local directory stores
/// identities.
///
/// ```
/// use dbauth_bridge::ticket::map_principal;
///
/// assert_eq!(map_principal("alice@EXAMPLE.COM"), "ALICE");
/// assert_eq!(map_principal("svc.report"), "SVC.REPORT");
/// ```
pub fn map_principal(principal: &str) -> String {
    let name = principal.split('@').next().unwrap_or(principal);
    name.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_principal_strips_realm() {
        assert_eq!(map_principal("alice@EXAMPLE.COM"), "ALICE");
    }

    #[test]
    fn test_map_principal_without_realm() {
        assert_eq!(map_principal("bob"), "BOB");
    }

    #[test]
    fn test_map_principal_uppercases() {
        assert_eq!(map_principal("Carol@corp.example"), "CAROL");
    }

    #[test]
    fn test_map_principal_first_at_wins() {
        assert_eq!(map_principal("odd@name@REALM"), "ODD");
    }

    #[test]
    fn test_map_principal_empty() {
        assert_eq!(map_principal(""), "");
    }
}
