use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::reward::Reward;
use crate::repositories::RewardStore;

pub struct PgRewardStore {
    pub pool: PgPool,
}

#[async_trait]
impl RewardStore for PgRewardStore {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Reward> {
        sqlx::query_as::<_, Reward>("SELECT * FROM rewards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_name(&self, user_id: Uuid, name: &str) -> RepoResult<Reward> {
        sqlx::query_as::<_, Reward>("SELECT * FROM rewards WHERE user_id = $1 AND name = $2")
            .bind(user_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?
            .ok_or(RepoError::NotFound)
    }

    async fn list_active(&self, user_id: Uuid) -> RepoResult<Vec<Reward>> {
        sqlx::query_as::<_, Reward>("SELECT * FROM rewards WHERE user_id = $1 AND active = true")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<Reward>> {
        sqlx::query_as::<_, Reward>("SELECT * FROM rewards WHERE user_id = $1 ORDER BY name ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn create(&self, reward: Reward) -> RepoResult<Reward> {
        sqlx::query_as::<_, Reward>(
            r#"
            INSERT INTO rewards (id, user_id, name, weight, pieces_required, piece_value, max_daily_claims, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(reward.id)
        .bind(reward.user_id)
        .bind(&reward.name)
        .bind(reward.weight)
        .bind(reward.pieces_required)
        .bind(reward.piece_value)
        .bind(reward.max_daily_claims)
        .bind(reward.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict("reward name already exists for this user".into())
            }
            _ => RepoError::Backend(e.into()),
        })
    }

    async fn claims_on(&self, user_id: Uuid, date: NaiveDate) -> RepoResult<HashMap<Uuid, i32>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT reward_id, COUNT(*) FROM habit_logs
            WHERE user_id = $1 AND last_completed_date = $2 AND got_reward = true AND reward_id IS NOT NULL
            GROUP BY reward_id
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))?;

        Ok(rows.into_iter().map(|(id, count)| (id, count as i32)).collect())
    }
}
