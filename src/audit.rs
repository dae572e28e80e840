//! Authentication audit trail.
//!
//! Every authentication attempt, success or failure, produces an
//! [`AuditEvent`]. Events are written to the `dbauth_bridge::audit`
//! tracing target so operators can route them separately from diagnostic
//! logs, and can additionally be tapped over a channel for tests and
//! in-process consumers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::method::AuthMethod;

/// Target for audit records, distinct from diagnostic logging.
pub const AUDIT_TARGET: &str = "dbauth_bridge::audit";

/// Terminal outcome of an attempt or of the whole selection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Authentication succeeded.
    Success,

    /// Authentication failed; the reason never contains credential
    /// material.
    Failure(String),

    /// The attempt exceeded its deadline.
    Timeout,
}

impl AuditOutcome {
    fn as_str(&self) -> &str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure(_) => "failure",
            AuditOutcome::Timeout => "timeout",
        }
    }
}

/// One audit record.
///
/// `method` is `None` for the run-level terminal record every selection
/// pass ends with; per-attempt records always name the method tried.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Connection this attempt belongs to.
    pub connection_id: Uuid,

    /// Method attempted, or `None` for a run-level record.
    pub method: Option<AuthMethod>,

    /// How the attempt ended.
    pub outcome: AuditOutcome,

    /// Wall time the attempt consumed.
    pub elapsed: Duration,

    /// Local identity, known only on success.
    pub local_identity: Option<String>,

    /// When the event was recorded.
    pub at: DateTime<Utc>,
}

/// Audit sink.
///
/// Cheap to clone; clones share the optional channel tap.
#[derive(Clone, Default)]
pub struct AuditLog {
    tap: Option<mpsc::UnboundedSender<AuditEvent>>,
}

impl AuditLog {
    /// Create a log that only writes to the tracing target.
    pub fn new() -> Self {
        Self { tap: None }
    }

    /// Create a log with an in-process tap alongside the tracing target.
    pub fn with_tap() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tap: Some(tx) }, rx)
    }

    /// Record an event.
    pub fn record(&self, event: AuditEvent) {
        match &event.outcome {
            AuditOutcome::Success => {
                tracing::info!(
                    target: AUDIT_TARGET,
                    connection_id = %event.connection_id,
                    method = event.method.map(|m| m.as_str()),
                    outcome = event.outcome.as_str(),
                    elapsed_ms = event.elapsed.as_millis() as u64,
                    local_identity = event.local_identity.as_deref(),
                    "Authentication attempt"
                );
            }
            AuditOutcome::Failure(reason) => {
                tracing::warn!(
                    target: AUDIT_TARGET,
                    connection_id = %event.connection_id,
                    method = event.method.map(|m| m.as_str()),
                    outcome = event.outcome.as_str(),
                    reason = %reason,
                    elapsed_ms = event.elapsed.as_millis() as u64,
                    "Authentication attempt"
                );
            }
            AuditOutcome::Timeout => {
                tracing::warn!(
                    target: AUDIT_TARGET,
                    connection_id = %event.connection_id,
                    method = event.method.map(|m| m.as_str()),
                    outcome = event.outcome.as_str(),
                    elapsed_ms = event.elapsed.as_millis() as u64,
                    "Authentication attempt"
                );
            }
        }

        if let Some(tap) = &self.tap {
            let _ = tap.send(event);
        }
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("tap", &self.tap.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(outcome: AuditOutcome) -> AuditEvent {
        AuditEvent {
            connection_id: Uuid::new_v4(),
            method: Some(AuthMethod::Password),
            outcome,
            elapsed: Duration::from_millis(12),
            local_identity: None,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_tap_receives_events() {
        let (log, mut rx) = AuditLog::with_tap();

        log.record(event(AuditOutcome::Success));
        log.record(event(AuditOutcome::Failure("rejected".to_string())));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.outcome, AuditOutcome::Success);

        let second = rx.try_recv().unwrap();
        assert!(matches!(second.outcome, AuditOutcome::Failure(_)));
    }

    #[test]
    fn test_untapped_log_records_without_panic() {
        let log = AuditLog::new();
        log.record(event(AuditOutcome::Timeout));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(AuditOutcome::Success.as_str(), "success");
        assert_eq!(AuditOutcome::Failure("x".to_string()).as_str(), "failure");
        assert_eq!(AuditOutcome::Timeout.as_str(), "timeout");
    }
}
