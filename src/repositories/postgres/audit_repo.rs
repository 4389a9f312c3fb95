use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::audit_log::{AuditEventKind, AuditLog};
use crate::repositories::AuditStore;

pub struct PgAuditStore {
    pub pool: PgPool,
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn log(
        &self,
        user_id: Uuid,
        kind: AuditEventKind,
        habit_id: Option<Uuid>,
        reward_id: Option<Uuid>,
        log_id: Option<Uuid>,
        payload: serde_json::Value,
        error_message: Option<String>,
    ) -> RepoResult<AuditLog> {
        sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO bot_audit_logs
                (id, created_at, user_id, event_kind, habit_id, reward_id, log_id, payload, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .bind(user_id)
        .bind(kind)
        .bind(habit_id)
        .bind(reward_id)
        .bind(log_id)
        .bind(payload)
        .bind(error_message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn timeline(&self, user_id: Uuid, hours_back: i64) -> RepoResult<Vec<AuditLog>> {
        let since = Utc::now() - chrono::Duration::hours(hours_back);
        sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM bot_audit_logs WHERE user_id = $1 AND created_at >= $2 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn trace_reward(&self, user_id: Uuid, reward_id: Uuid) -> RepoResult<Vec<AuditLog>> {
        sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM bot_audit_logs WHERE user_id = $1 AND reward_id = $2 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(reward_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn cleanup(&self, older_than_days: i64) -> RepoResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(older_than_days);
        let result = sqlx::query("DELETE FROM bot_audit_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?;
        Ok(result.rows_affected())
    }
}
