//! Token issuance.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::SecurityAuditLog;
use crate::db::TokenStore;
use crate::error::Result;
use crate::models::{SecurityEvent, TokenPurpose, TokenRecord};
use crate::security::{hash_token, DeviceContext, DeviceFingerprinter, TokenClaims, TokenCodec};

/// A freshly issued token: the signed string for URL embedding plus
/// the persisted record.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub record: TokenRecord,
}

pub struct TokenIssuer {
    store: Arc<dyn TokenStore>,
    codec: Arc<TokenCodec>,
    fingerprinter: DeviceFingerprinter,
    audit: Arc<SecurityAuditLog>,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn TokenStore>,
        codec: Arc<TokenCodec>,
        audit: Arc<SecurityAuditLog>,
    ) -> Self {
        Self {
            store,
            codec,
            fingerprinter: DeviceFingerprinter::new(),
            audit,
        }
    }

    /// Create and persist a token granting `subject_id` access for
    /// `purpose`.
    ///
    /// Usage cap and lifetime come from the purpose policy table,
    /// never from the caller, so a compromised caller cannot widen a
    /// token's privileges. Device context is advisory: tokens for
    /// outgoing email are issued without one.
    ///
    /// The record is durable before the token string is returned; no
    /// token ever circulates without a backing record.
    pub async fn issue(
        &self,
        subject_id: Uuid,
        purpose: TokenPurpose,
        device: Option<&DeviceContext>,
    ) -> Result<IssuedToken> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let expires_at = now + purpose.lifetime();

        let claims = TokenClaims {
            sub: subject_id,
            purpose,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: id,
        };
        let token = self.codec.encode(&claims)?;

        let record = TokenRecord {
            id,
            token_hash: hash_token(&token),
            subject_id,
            purpose,
            device_fingerprint: device.map(|d| self.fingerprinter.fingerprint_context(d)),
            max_usage: purpose.max_usage(),
            usage_count: 0,
            issued_at: now,
            expires_at,
            revoked_at: None,
        };

        self.store.insert(&record).await?;
        self.audit.record(SecurityEvent::issued(&record)).await;

        Ok(IssuedToken { token, record })
    }
}
