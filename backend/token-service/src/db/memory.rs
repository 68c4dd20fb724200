//! In-process store and sink used by the integration tests and local
//! development.
//!
//! These are store *implementations*, not caches in front of one: all
//! mutations go through the same mutex, so the check-and-increment and
//! revocation semantics match the Postgres adapter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AuditSink, TokenStore, UsageOutcome};
use crate::error::{Result, TokenError};
use crate::models::{SecurityEvent, TokenRecord};

#[derive(Default)]
pub struct MemoryTokenStore {
    records: Mutex<HashMap<Uuid, TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, TokenRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, record: &TokenRecord) -> Result<()> {
        let mut records = self.lock();
        if records.values().any(|r| r.token_hash == record.token_hash) {
            return Err(TokenError::StoreUnavailable(
                "duplicate token_hash".to_string(),
            ));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<TokenRecord>> {
        Ok(self
            .lock()
            .values()
            .find(|r| r.token_hash == token_hash)
            .cloned())
    }

    async fn try_increment_usage(&self, token_id: Uuid) -> Result<UsageOutcome> {
        let mut records = self.lock();
        let Some(record) = records.get_mut(&token_id) else {
            return Ok(UsageOutcome::Missing);
        };
        if record.revoked_at.is_some() {
            return Ok(UsageOutcome::Revoked);
        }
        if record.usage_count >= record.max_usage {
            return Ok(UsageOutcome::Exhausted);
        }
        record.usage_count += 1;
        Ok(UsageOutcome::Admitted)
    }

    async fn revoke(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut records = self.lock();
        match records.get_mut(&token_id) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_subject(&self, subject_id: Uuid, at: DateTime<Utc>) -> Result<u64> {
        let mut records = self.lock();
        let mut revoked = 0;
        for record in records.values_mut() {
            if record.subject_id == subject_id
                && record.revoked_at.is_none()
                && record.expires_at > at
            {
                record.revoked_at = Some(at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, r| r.expires_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

/// Collects events in memory; can be switched into a failing mode to
/// exercise audit-failure isolation.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<SecurityEvent>>,
    failing: AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, event: &SecurityEvent) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TokenError::StoreUnavailable(
                "audit sink unavailable".to_string(),
            ));
        }
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }
}
