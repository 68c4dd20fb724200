/// Persistence layer for token records and security events
pub mod audit;
pub mod memory;
pub mod tokens;

pub use audit::PgAuditSink;
pub use memory::{MemoryAuditSink, MemoryTokenStore};
pub use tokens::PgTokenStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{SecurityEvent, TokenRecord};

/// Outcome of the atomic usage check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOutcome {
    /// A usage slot was consumed.
    Admitted,
    /// `usage_count` already reached `max_usage`; nothing was written.
    Exhausted,
    /// The token was revoked after it was loaded (a revocation raced
    /// the validation).
    Revoked,
    /// The record disappeared between lookup and increment.
    Missing,
}

/// Durable store for token records.
///
/// The single source of truth for token validity: usage counts and
/// revocation state are never cached outside the store, and mutations
/// on the same token serialize inside the implementation. Each
/// mutating method is one atomic unit, so a cancelled caller can never
/// leave a half-applied update behind.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a newly issued record. `token_hash` is unique per record.
    async fn insert(&self, record: &TokenRecord) -> Result<()>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<TokenRecord>>;

    /// Conditionally increment `usage_count`. The guard and the write
    /// are a single storage-level operation: two concurrent calls
    /// racing for the last slot admit exactly one.
    async fn try_increment_usage(&self, token_id: Uuid) -> Result<UsageOutcome>;

    /// One-way transition of `revoked_at`. Returns false when the
    /// record was already revoked or does not exist.
    async fn revoke(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// Revoke every outstanding (unexpired, unrevoked) record for a
    /// subject in a single filtered update. Returns the number of
    /// records revoked.
    async fn revoke_all_for_subject(&self, subject_id: Uuid, at: DateTime<Utc>) -> Result<u64>;

    /// Retention helper: delete records whose expiry predates the
    /// cutoff. Invoked by the out-of-band retention job, never by the
    /// request path.
    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Append-only sink for security events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, event: &SecurityEvent) -> Result<()>;
}
