use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::user::User;
use crate::repositories::UserStore;

pub struct PgUserStore {
    pub pool: PgPool,
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_telegram_id(&self, telegram_id: &str) -> RepoResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?
            .ok_or(RepoError::NotFound)
    }

    async fn update_profile(&self, id: Uuid, name: Option<&str>, language: Option<&str>) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                language = COALESCE($3, language)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(language)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))?
        .ok_or(RepoError::NotFound)
    }
}
