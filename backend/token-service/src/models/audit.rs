use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::TokenError;
use crate::models::TokenRecord;

/// Security-relevant event appended to the audit log.
///
/// The context payload never contains the raw token string or the
/// inputs a device fingerprint was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub token_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub event_type: SecurityEventType,
    /// Reason code, present for rejections only.
    pub reason: Option<RejectReason>,
    pub severity: Severity,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum SecurityEventType {
    #[sqlx(rename = "issued")]
    Issued,
    #[sqlx(rename = "validated")]
    Validated,
    #[sqlx(rename = "rejected")]
    Rejected,
    #[sqlx(rename = "revoked")]
    Revoked,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::Issued => "issued",
            SecurityEventType::Validated => "validated",
            SecurityEventType::Rejected => "rejected",
            SecurityEventType::Revoked => "revoked",
        }
    }
}

/// Reason codes for rejected validations, mirroring the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum RejectReason {
    #[sqlx(rename = "malformed_or_forged")]
    MalformedOrForged,
    #[sqlx(rename = "not_found")]
    NotFound,
    #[sqlx(rename = "expired")]
    Expired,
    #[sqlx(rename = "usage_exhausted")]
    UsageExhausted,
    #[sqlx(rename = "revoked")]
    Revoked,
    #[sqlx(rename = "purpose_mismatch")]
    PurposeMismatch,
    #[sqlx(rename = "device_mismatch")]
    DeviceMismatch,
    #[sqlx(rename = "store_unavailable")]
    StoreUnavailable,
    #[sqlx(rename = "internal")]
    Internal,
}

impl RejectReason {
    /// Infrastructure failures outrank every token-state rejection.
    pub fn severity(&self) -> Severity {
        match self {
            RejectReason::StoreUnavailable | RejectReason::Internal => Severity::Critical,
            _ => Severity::Warning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MalformedOrForged => "malformed_or_forged",
            RejectReason::NotFound => "not_found",
            RejectReason::Expired => "expired",
            RejectReason::UsageExhausted => "usage_exhausted",
            RejectReason::Revoked => "revoked",
            RejectReason::PurposeMismatch => "purpose_mismatch",
            RejectReason::DeviceMismatch => "device_mismatch",
            RejectReason::StoreUnavailable => "store_unavailable",
            RejectReason::Internal => "internal",
        }
    }
}

impl From<&TokenError> for RejectReason {
    fn from(err: &TokenError) -> Self {
        match err {
            TokenError::MalformedOrForged => RejectReason::MalformedOrForged,
            TokenError::NotFound => RejectReason::NotFound,
            TokenError::Expired => RejectReason::Expired,
            TokenError::UsageExhausted => RejectReason::UsageExhausted,
            TokenError::Revoked => RejectReason::Revoked,
            TokenError::PurposeMismatch => RejectReason::PurposeMismatch,
            TokenError::DeviceMismatch => RejectReason::DeviceMismatch,
            TokenError::StoreUnavailable(_) => RejectReason::StoreUnavailable,
            TokenError::Internal(_) => RejectReason::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum Severity {
    #[sqlx(rename = "info")]
    Info,
    #[sqlx(rename = "warning")]
    Warning,
    #[sqlx(rename = "critical")]
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl SecurityEvent {
    pub fn issued(record: &TokenRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_id: Some(record.id),
            subject_id: Some(record.subject_id),
            event_type: SecurityEventType::Issued,
            reason: None,
            severity: Severity::Info,
            context: json!({
                "purpose": record.purpose.as_str(),
                "max_usage": record.max_usage,
                "expires_at": record.expires_at,
                "device_bound": record.device_fingerprint.is_some(),
            }),
            created_at: Utc::now(),
        }
    }

    pub fn validated(record: &TokenRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_id: Some(record.id),
            subject_id: Some(record.subject_id),
            event_type: SecurityEventType::Validated,
            reason: None,
            severity: Severity::Info,
            context: json!({ "purpose": record.purpose.as_str() }),
            created_at: Utc::now(),
        }
    }

    pub fn rejected(
        token_id: Option<Uuid>,
        subject_id: Option<Uuid>,
        error: &TokenError,
    ) -> Self {
        let reason = RejectReason::from(error);
        Self {
            id: Uuid::new_v4(),
            token_id,
            subject_id,
            event_type: SecurityEventType::Rejected,
            reason: Some(reason),
            severity: reason.severity(),
            context: json!({}),
            created_at: Utc::now(),
        }
    }

    pub fn revoked(token_id: Option<Uuid>, subject_id: Option<Uuid>, count: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_id,
            subject_id,
            event_type: SecurityEventType::Revoked,
            reason: None,
            severity: Severity::Info,
            context: json!({ "count": count }),
            created_at: Utc::now(),
        }
    }
}
