//! Bounded dispatch for outbound calls to external services.
//!
//! Authorization-server requests, ticket-backend steps, secret-store
//! reads, and directory lookups are all slow I/O from the caller's
//! perspective. [`OutboundGate`] bounds how many of them run at once so a
//! slow external service for one connection cannot stall the scheduler
//! handling other connections.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{AuthError, Result};

/// Semaphore-bounded executor for outbound I/O.
///
/// # Example
///
/// ```
/// use dbauth_bridge::dispatch::OutboundGate;
///
/// # async fn demo() -> dbauth_bridge::Result<()> {
/// let gate = OutboundGate::new(16);
/// let value = gate.run(async { Ok(42) }).await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
pub struct OutboundGate {
    permits: Arc<Semaphore>,
}

impl OutboundGate {
    /// Create a gate allowing up to `max_calls` simultaneous outbound calls.
    pub fn new(max_calls: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_calls)),
        }
    }

    /// Run an outbound call under a permit.
    ///
    /// Waits for a free permit, then drives the future to completion. The
    /// permit is released when the future finishes or is dropped, so an
    /// abandoned call (method deadline) frees its slot immediately.
    pub async fn run<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AuthError::Protocol("outbound gate closed".to_string()))?;
        call.await
    }

    /// Number of currently free permits.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
