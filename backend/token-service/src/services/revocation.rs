//! Token revocation.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::SecurityAuditLog;
use crate::db::TokenStore;
use crate::error::Result;
use crate::models::SecurityEvent;

/// Explicit, irreversible invalidation of tokens, independent of
/// expiry and remaining usage.
pub struct RevocationManager {
    store: Arc<dyn TokenStore>,
    audit: Arc<SecurityAuditLog>,
}

impl RevocationManager {
    pub fn new(store: Arc<dyn TokenStore>, audit: Arc<SecurityAuditLog>) -> Self {
        Self { store, audit }
    }

    /// Set `revoked_at` if not already set. Idempotent: revoking an
    /// already-revoked or unknown token is a no-op.
    pub async fn revoke_token(&self, token_id: Uuid) -> Result<()> {
        let newly_revoked = self.store.revoke(token_id, Utc::now()).await?;
        if newly_revoked {
            self.audit
                .record(SecurityEvent::revoked(Some(token_id), None, 1))
                .await;
        }
        Ok(())
    }

    /// Revoke every outstanding (unexpired, unrevoked) token for a
    /// subject as one filtered store update. Used when, e.g., an
    /// unsubscribe completes and all live links for the subject must
    /// stop working. Returns the number of tokens revoked.
    pub async fn revoke_all_for_subject(&self, subject_id: Uuid) -> Result<u64> {
        let revoked = self
            .store
            .revoke_all_for_subject(subject_id, Utc::now())
            .await?;
        self.audit
            .record(SecurityEvent::revoked(None, Some(subject_id), revoked))
            .await;
        Ok(revoked)
    }
}
