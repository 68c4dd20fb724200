//! Append-only security audit logging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::db::AuditSink;
use crate::models::{SecurityEvent, Severity};

/// Records security-relevant events without ever failing the caller.
///
/// A missing audit write must not block a legitimate user action, so
/// sink failures are swallowed here: logged at error level and counted
/// for alerting, never propagated as a validation error.
pub struct SecurityAuditLog {
    sink: Arc<dyn AuditSink>,
    write_failures: AtomicU64,
}

impl SecurityAuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            write_failures: AtomicU64::new(0),
        }
    }

    /// Append an event. Infallible from the caller's perspective.
    pub async fn record(&self, event: SecurityEvent) {
        let reason = event.reason.map(|r| r.as_str());
        match event.severity {
            Severity::Info => info!(
                event_type = event.event_type.as_str(),
                token_id = ?event.token_id,
                subject_id = ?event.subject_id,
                "security event"
            ),
            Severity::Warning => warn!(
                event_type = event.event_type.as_str(),
                token_id = ?event.token_id,
                subject_id = ?event.subject_id,
                reason = ?reason,
                "security event"
            ),
            Severity::Critical => error!(
                event_type = event.event_type.as_str(),
                token_id = ?event.token_id,
                subject_id = ?event.subject_id,
                reason = ?reason,
                "security event"
            ),
        }

        if let Err(err) = self.sink.append(&event).await {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            error!(error = %err, "audit sink write failed");
        }
    }

    /// Number of audit writes that could not be persisted. Scraped by
    /// operators to alert on a silently failing sink.
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }
}
