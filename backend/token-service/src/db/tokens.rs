/// Token record store backed by PostgreSQL
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{TokenStore, UsageOutcome};
use crate::error::Result;
use crate::models::TokenRecord;

/// `user_tokens` adapter.
///
/// Every mutation is a single conditional `UPDATE` with an
/// affected-row check, so concurrent validations and revocations of
/// the same token serialize at the database without application-level
/// read-then-write.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, record: &TokenRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens
                (id, token_hash, subject_id, purpose, device_fingerprint,
                 max_usage, usage_count, issued_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(&record.token_hash)
        .bind(record.subject_id)
        .bind(record.purpose)
        .bind(&record.device_fingerprint)
        .bind(record.max_usage)
        .bind(record.usage_count)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<TokenRecord>> {
        let record = sqlx::query_as::<_, TokenRecord>(
            r#"
            SELECT id, token_hash, subject_id, purpose, device_fingerprint,
                   max_usage, usage_count, issued_at, expires_at, revoked_at
            FROM user_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn try_increment_usage(&self, token_id: Uuid) -> Result<UsageOutcome> {
        // The guard eliminates the lost-update race where two requests
        // both read usage_count = max_usage - 1 and both proceed.
        let result = sqlx::query(
            r#"
            UPDATE user_tokens
            SET usage_count = usage_count + 1
            WHERE id = $1
              AND revoked_at IS NULL
              AND usage_count < max_usage
            "#,
        )
        .bind(token_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(UsageOutcome::Admitted);
        }

        // Distinguish why the guard failed.
        let row = sqlx::query_as::<_, (Option<DateTime<Utc>>,)>(
            "SELECT revoked_at FROM user_tokens WHERE id = $1",
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            None => UsageOutcome::Missing,
            Some((Some(_),)) => UsageOutcome::Revoked,
            Some((None,)) => UsageOutcome::Exhausted,
        })
    }

    async fn revoke(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_tokens
            SET revoked_at = $2
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_subject(&self, subject_id: Uuid, at: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_tokens
            SET revoked_at = $2
            WHERE subject_id = $1
              AND revoked_at IS NULL
              AND expires_at > $2
            "#,
        )
        .bind(subject_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
