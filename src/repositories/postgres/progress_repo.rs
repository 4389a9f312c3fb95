use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::reward_progress::RewardProgress;
use crate::repositories::ProgressStore;

pub struct PgProgressStore {
    pub pool: PgPool,
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn find(&self, user_id: Uuid, reward_id: Uuid) -> RepoResult<Option<RewardProgress>> {
        sqlx::query_as::<_, RewardProgress>(
            "SELECT * FROM reward_progress WHERE user_id = $1 AND reward_id = $2",
        )
        .bind(user_id)
        .bind(reward_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn upsert(&self, progress: RewardProgress) -> RepoResult<RewardProgress> {
        sqlx::query_as::<_, RewardProgress>(
            r#"
            INSERT INTO reward_progress (id, user_id, reward_id, pieces_earned, claimed)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, reward_id) DO UPDATE SET
                pieces_earned = EXCLUDED.pieces_earned,
                claimed = EXCLUDED.claimed
            RETURNING *
            "#,
        )
        .bind(progress.id)
        .bind(progress.user_id)
        .bind(progress.reward_id)
        .bind(progress.pieces_earned)
        .bind(progress.claimed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<RewardProgress>> {
        sqlx::query_as::<_, RewardProgress>("SELECT * FROM reward_progress WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))
    }
}
