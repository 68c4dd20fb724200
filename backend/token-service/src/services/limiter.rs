//! Per-token usage limiting.

use std::sync::Arc;

use uuid::Uuid;

use crate::db::{TokenStore, UsageOutcome};
use crate::error::{Result, TokenError};

/// Consumes usage slots against a token's cap.
///
/// The check and the increment are one atomic store operation, so two
/// simultaneous validations racing for the last slot admit exactly
/// one. The increment that would exceed `max_usage` is rejected, not
/// clamped.
pub struct UsageLimiter {
    store: Arc<dyn TokenStore>,
}

impl UsageLimiter {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub async fn check_and_increment(&self, token_id: Uuid) -> Result<()> {
        match self.store.try_increment_usage(token_id).await? {
            UsageOutcome::Admitted => Ok(()),
            UsageOutcome::Exhausted => Err(TokenError::UsageExhausted),
            // A revocation raced the validation; the store is the
            // source of truth, so honor it.
            UsageOutcome::Revoked => Err(TokenError::Revoked),
            UsageOutcome::Missing => Err(TokenError::NotFound),
        }
    }
}
