use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The single action a token authorizes. A token is never valid across
/// purposes: a preferences link cannot be replayed as an unsubscribe
/// action or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar")]
pub enum TokenPurpose {
    #[sqlx(rename = "email_preferences")]
    EmailPreferences,
    #[sqlx(rename = "unsubscribe")]
    Unsubscribe,
}

impl TokenPurpose {
    /// Cap on successful validations. Fixed policy table, never
    /// caller-supplied, so a compromised caller cannot widen it.
    pub fn max_usage(&self) -> i32 {
        match self {
            TokenPurpose::EmailPreferences => 10,
            TokenPurpose::Unsubscribe => 3,
        }
    }

    /// Token lifetime from issuance.
    pub fn lifetime(&self) -> Duration {
        match self {
            TokenPurpose::EmailPreferences => Duration::hours(24),
            TokenPurpose::Unsubscribe => Duration::hours(72),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailPreferences => "email_preferences",
            TokenPurpose::Unsubscribe => "unsubscribe",
        }
    }
}

/// One row per issued token.
///
/// Immutable after creation except for `usage_count` (monotonic
/// increment, never past `max_usage`) and `revoked_at` (one-way
/// transition from null). Records are retained after expiry or
/// exhaustion for audit; garbage collection is a separate retention
/// job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenRecord {
    pub id: Uuid,
    /// SHA-256 of the signed token string. The raw token is never stored.
    pub token_hash: String,
    pub subject_id: Uuid,
    pub purpose: TokenPurpose,
    /// Fingerprint captured at issuance, or None when the token was
    /// issued without device context (e.g. server-side for an email
    /// that will be opened on an unknown device).
    pub device_fingerprint: Option<String>,
    pub max_usage: i32,
    pub usage_count: i32,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn remaining_usage(&self) -> i32 {
        (self.max_usage - self.usage_count).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_policy_table() {
        assert_eq!(TokenPurpose::EmailPreferences.max_usage(), 10);
        assert_eq!(
            TokenPurpose::EmailPreferences.lifetime(),
            Duration::hours(24)
        );
        assert_eq!(TokenPurpose::Unsubscribe.max_usage(), 3);
        assert_eq!(TokenPurpose::Unsubscribe.lifetime(), Duration::hours(72));
    }

    #[test]
    fn test_purpose_serde_codes() {
        let json = serde_json::to_string(&TokenPurpose::EmailPreferences).unwrap();
        assert_eq!(json, "\"email_preferences\"");
        let parsed: TokenPurpose = serde_json::from_str("\"unsubscribe\"").unwrap();
        assert_eq!(parsed, TokenPurpose::Unsubscribe);
    }

    #[test]
    fn test_record_helpers() {
        let now = Utc::now();
        let record = TokenRecord {
            id: Uuid::new_v4(),
            token_hash: "abc".into(),
            subject_id: Uuid::new_v4(),
            purpose: TokenPurpose::Unsubscribe,
            device_fingerprint: None,
            max_usage: 3,
            usage_count: 2,
            issued_at: now,
            expires_at: now + Duration::hours(72),
            revoked_at: None,
        };

        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::hours(73)));
        assert!(!record.is_revoked());
        assert_eq!(record.remaining_usage(), 1);
    }
}
