//! Multi-layer token validation.
//!
//! The core state machine of the subsystem. A validation lands in
//! exactly one terminal outcome: `Ok(subject_id)` or one of the
//! taxonomy failures. The ordered checks short-circuit on the first
//! failure, and every branch (success included) emits exactly one
//! audit event with its reason code.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{SecurityAuditLog, UsageLimiter};
use crate::db::TokenStore;
use crate::error::{Result, TokenError};
use crate::models::{SecurityEvent, TokenPurpose};
use crate::security::{hash_token, DeviceContext, DeviceFingerprinter, TokenCodec};

pub struct TokenValidator {
    store: Arc<dyn TokenStore>,
    codec: Arc<TokenCodec>,
    fingerprinter: DeviceFingerprinter,
    limiter: UsageLimiter,
    audit: Arc<SecurityAuditLog>,
}

impl TokenValidator {
    pub fn new(
        store: Arc<dyn TokenStore>,
        codec: Arc<TokenCodec>,
        audit: Arc<SecurityAuditLog>,
    ) -> Self {
        let limiter = UsageLimiter::new(store.clone());
        Self {
            store,
            codec,
            fingerprinter: DeviceFingerprinter::new(),
            limiter,
            audit,
        }
    }

    /// Validate `token` for `expected_purpose`, returning the subject
    /// it grants access to.
    ///
    /// Check order: signature, lookup, revocation, purpose, expiry,
    /// device, usage. The order is load-bearing: the signature only
    /// proves integrity and origin, while the stored record is
    /// authoritative for everything that can change after issuance.
    /// The only blocking operations are the store round-trips and the
    /// audit write.
    pub async fn validate(
        &self,
        token: &str,
        expected_purpose: TokenPurpose,
        device: Option<&DeviceContext>,
    ) -> Result<Uuid> {
        // 1. Verify the signature and parse claims. Anything
        //    structurally off fails closed here.
        let claims = match self.codec.decode(token) {
            Ok(claims) => claims,
            Err(err) => return self.reject(None, None, err).await,
        };
        let token_id = Some(claims.jti);
        let subject_id = Some(claims.sub);

        // 2. Load the authoritative record.
        let record = match self.store.find_by_hash(&hash_token(token)).await {
            Ok(Some(record)) => record,
            Ok(None) => return self.reject(token_id, subject_id, TokenError::NotFound).await,
            Err(err) => return self.reject(token_id, subject_id, err).await,
        };

        // 3. Revocation is permanent, regardless of remaining usage or
        //    time.
        if record.is_revoked() {
            return self
                .reject(Some(record.id), Some(record.subject_id), TokenError::Revoked)
                .await;
        }

        // 4. Purpose binding: a preferences link must not replay as an
        //    unsubscribe action or vice versa.
        if record.purpose != expected_purpose {
            return self
                .reject(
                    Some(record.id),
                    Some(record.subject_id),
                    TokenError::PurposeMismatch,
                )
                .await;
        }

        // 5. Expiry, decided on the stored record. The exp claim in
        //    the token is self-description only.
        if record.is_expired(Utc::now()) {
            return self
                .reject(Some(record.id), Some(record.subject_id), TokenError::Expired)
                .await;
        }

        // 6. Soft device binding: enforced only when a fingerprint was
        //    captured at issuance. Checked before the limiter so a
        //    mismatch never consumes a usage slot.
        if let Some(expected) = &record.device_fingerprint {
            let presented = device.map(|d| self.fingerprinter.fingerprint_context(d));
            if presented.as_deref() != Some(expected.as_str()) {
                return self
                    .reject(
                        Some(record.id),
                        Some(record.subject_id),
                        TokenError::DeviceMismatch,
                    )
                    .await;
            }
        }

        // 7. Atomic usage check-and-increment.
        if let Err(err) = self.limiter.check_and_increment(record.id).await {
            return self
                .reject(Some(record.id), Some(record.subject_id), err)
                .await;
        }

        // 8. Admitted.
        self.audit.record(SecurityEvent::validated(&record)).await;
        Ok(record.subject_id)
    }

    async fn reject(
        &self,
        token_id: Option<Uuid>,
        subject_id: Option<Uuid>,
        err: TokenError,
    ) -> Result<Uuid> {
        self.audit
            .record(SecurityEvent::rejected(token_id, subject_id, &err))
            .await;
        Err(err)
    }
}
