/// Security event sink backed by PostgreSQL
use async_trait::async_trait;
use sqlx::PgPool;

use super::AuditSink;
use crate::error::Result;
use crate::models::SecurityEvent;

/// `security_events` adapter. Insert-only; rows are never updated or
/// deleted by this service.
#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, event: &SecurityEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO security_events
                (id, token_id, subject_id, event_type, reason, severity, context, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id)
        .bind(event.token_id)
        .bind(event.subject_id)
        .bind(event.event_type)
        .bind(event.reason)
        .bind(event.severity)
        .bind(&event.context)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
