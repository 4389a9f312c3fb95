use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::api_key::ApiKey;
use crate::repositories::ApiKeyStore;

pub struct PgApiKeyStore {
    pub pool: PgPool,
}

#[async_trait]
impl ApiKeyStore for PgApiKeyStore {
    async fn find_by_name(&self, user_id: Uuid, name: &str) -> RepoResult<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE user_id = $1 AND name = $2")
            .bind(user_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn create(&self, key: ApiKey) -> RepoResult<ApiKey> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (id, user_id, key_hash, name, created_at, last_used_at, expires_at, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(key.id)
        .bind(key.user_id)
        .bind(&key.key_hash)
        .bind(&key.name)
        .bind(key.created_at)
        .bind(key.last_used_at)
        .bind(key.expires_at)
        .bind(key.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict("api key name already exists for this user".into())
            }
            _ => RepoError::Backend(e.into()),
        })
    }

    async fn find_by_hash(&self, key_hash: &str) -> RepoResult<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE key_hash = $1")
            .bind(key_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn revoke(&self, id: Uuid, user_id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("UPDATE api_keys SET active = false WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?;
        Ok(())
    }
}
