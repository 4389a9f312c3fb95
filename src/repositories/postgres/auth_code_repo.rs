use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::auth_code::AuthCode;
use crate::repositories::AuthCodeStore;

pub struct PgAuthCodeStore {
    pub pool: PgPool,
}

#[async_trait]
impl AuthCodeStore for PgAuthCodeStore {
    async fn count_issued_since(&self, user_id: Uuid, since: DateTime<Utc>) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM auth_codes WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn invalidate_unused(&self, user_id: Uuid) -> RepoResult<()> {
        sqlx::query("UPDATE auth_codes SET used = true WHERE user_id = $1 AND used = false")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?;
        Ok(())
    }

    async fn insert(&self, code: AuthCode) -> RepoResult<AuthCode> {
        sqlx::query_as::<_, AuthCode>(
            r#"
            INSERT INTO auth_codes
                (id, user_id, code, created_at, expires_at, used, failed_attempts, locked_until, device_info)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(code.id)
        .bind(code.user_id)
        .bind(&code.code)
        .bind(code.created_at)
        .bind(code.expires_at)
        .bind(code.used)
        .bind(code.failed_attempts)
        .bind(code.locked_until)
        .bind(&code.device_info)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn try_consume(&self, user_id: Uuid, code: &str, now: DateTime<Utc>) -> RepoResult<Option<AuthCode>> {
        sqlx::query_as::<_, AuthCode>(
            r#"
            UPDATE auth_codes SET used = true
            WHERE user_id = $1 AND code = $2 AND used = false
              AND expires_at > $3
              AND (locked_until IS NULL OR locked_until <= $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn find_latest_active(&self, user_id: Uuid, now: DateTime<Utc>) -> RepoResult<Option<AuthCode>> {
        sqlx::query_as::<_, AuthCode>(
            r#"
            SELECT * FROM auth_codes
            WHERE user_id = $1 AND used = false AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn record_failed_attempt(
        &self,
        id: Uuid,
        failed_attempts: i32,
        lock_until: Option<DateTime<Utc>>,
    ) -> RepoResult<()> {
        sqlx::query(
            "UPDATE auth_codes SET failed_attempts = $2, locked_until = COALESCE($3, locked_until) WHERE id = $1",
        )
        .bind(id)
        .bind(failed_attempts)
        .bind(lock_until)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))?;
        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM auth_codes WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?;
        Ok(result.rows_affected())
    }
}
