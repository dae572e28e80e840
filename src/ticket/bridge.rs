//! Multi-round-trip ticket handshake driver.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use super::{ContextStep, ForeignIdentity, TicketAuthority, TicketState};
use crate::config::TicketConfig;
use crate::dispatch::OutboundGate;
use crate::error::{AuthError, Result};
use crate::selector::ClientExchange;

/// Upper bound on backend steps before the handshake is declared broken.
///
/// Real negotiations finish in one to three rounds; anything past this is
/// a misbehaving client or backend looping forever.
const MAX_ROUNDS: u32 = 8;

/// Drives the ticket negotiation between a connected client and the
/// external ticket backend.
///
/// The bridge enforces a cumulative deadline across the whole handshake.
/// Every client read, backend step, and continuation write counts against
/// the same clock; when it runs out the attempt fails with
/// [`AuthError::TicketTimeout`] and the caller moves on to the next
/// authentication method.
pub struct TicketBridge {
    authority: Arc<dyn TicketAuthority>,
    service_name: String,
    gate: Arc<OutboundGate>,
    deadline: Duration,
}

impl TicketBridge {
    /// Create a bridge over the given backend.
    pub fn new(
        config: &TicketConfig,
        authority: Arc<dyn TicketAuthority>,
        gate: Arc<OutboundGate>,
        deadline: Duration,
    ) -> Self {
        if let Some(path) = &config.credential_store {
            debug!(
                credential_store = %path.display(),
                service = %config.service_name,
                "Service credential store configured"
            );
        }

        Self {
            authority,
            service_name: config.service_name.clone(),
            gate,
            deadline,
        }
    }

    /// Run the handshake to completion.
    ///
    /// Reads ticket blobs from the client, feeds each into the backend,
    /// and relays continuation blobs back until the backend declares the
    /// security context complete.
    ///
    /// # Errors
    ///
    /// * [`AuthError::TicketTimeout`] - Cumulative deadline exceeded
    /// * [`AuthError::TicketHandshake`] - Backend rejected the ticket,
    ///   the client hung up mid-negotiation, or the round limit was hit
    pub async fn authenticate(&self, exchange: &mut ClientExchange) -> Result<ForeignIdentity> {
        let result = self.negotiate(exchange).await;
        let state = if result.is_ok() {
            TicketState::Complete
        } else {
            TicketState::Failed
        };
        trace!(state = ?state, "Ticket negotiation finished");
        result
    }

    async fn negotiate(&self, exchange: &mut ClientExchange) -> Result<ForeignIdentity> {
        let deadline = Instant::now() + self.deadline;
        let mut state = TicketState::AwaitingTicket;

        loop {
            let rounds = match &state {
                TicketState::AwaitingTicket => 0,
                TicketState::ContextStep { rounds } => *rounds,
                TicketState::Complete | TicketState::Failed => {
                    return Err(AuthError::TicketHandshake(
                        "negotiation re-entered a finished context".to_string(),
                    ));
                }
            };
            if rounds >= MAX_ROUNDS {
                return Err(AuthError::TicketHandshake(format!(
                    "negotiation exceeded {} rounds",
                    MAX_ROUNDS
                )));
            }

            let input = self.recv_until(exchange, deadline).await?;
            let mut step = self.step_until(&input, deadline).await?;

            if let Some(continuation) = step.continuation.take() {
                exchange.send_continuation(continuation).await?;
            }

            if step.complete {
                return self.finish(step);
            }

            state = TicketState::ContextStep { rounds: rounds + 1 };
            trace!(rounds = rounds + 1, "Ticket negotiation continues");
        }
    }

    /// Read the next client blob, bounded by the cumulative deadline.
    async fn recv_until(
        &self,
        exchange: &mut ClientExchange,
        deadline: Instant,
    ) -> Result<Vec<u8>> {
        match tokio::time::timeout_at(deadline, exchange.recv_ticket()).await {
            Ok(Some(blob)) => Ok(blob),
            Ok(None) => Err(AuthError::TicketHandshake(
                "client closed the exchange mid-negotiation".to_string(),
            )),
            Err(_) => Err(AuthError::TicketTimeout(self.deadline)),
        }
    }

    /// Run one backend step under the outbound gate, bounded by the
    /// cumulative deadline.
    async fn step_until(&self, input: &[u8], deadline: Instant) -> Result<ContextStep> {
        let call = self.gate.run(self.authority.step(&self.service_name, input));
        match tokio::time::timeout_at(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::TicketTimeout(self.deadline)),
        }
    }

    fn finish(&self, step: ContextStep) -> Result<ForeignIdentity> {
        let principal = step.principal.ok_or_else(|| {
            AuthError::TicketHandshake("backend completed without a principal".to_string())
        })?;

        debug!(principal = %principal, "Ticket handshake complete");
        Ok(ForeignIdentity {
            principal,
            authenticated_at: Utc::now(),
            ticket_expiry: step.ticket_expiry,
        })
    }
}
