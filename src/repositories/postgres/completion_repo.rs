use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::habit_log::HabitLog;
use crate::models::reward_progress::RewardProgress;
use crate::repositories::CompletionStore;

/// Backs the completion and revert engines' atomicity requirement: log
/// write and progress increment/decrement happen in one transaction, with
/// the increment expressed as a lock-free upsert (row lock on
/// `reward_progress(user, reward)` taken implicitly by the `ON CONFLICT`
/// clause).
pub struct PgCompletionStore {
    pub pool: PgPool,
}

#[async_trait]
impl CompletionStore for PgCompletionStore {
    async fn commit_completion(
        &self,
        log: HabitLog,
        reward_to_increment: Option<Uuid>,
    ) -> RepoResult<(HabitLog, Option<RewardProgress>)> {
        let mut tx = self.pool.begin().await.map_err(|e| RepoError::Backend(e.into()))?;

        let progress = if let Some(reward_id) = reward_to_increment {
            let progress = sqlx::query_as::<_, RewardProgress>(
                r#"
                INSERT INTO reward_progress (id, user_id, reward_id, pieces_earned, claimed)
                VALUES ($1, $2, $3, 1, false)
                ON CONFLICT (user_id, reward_id) DO UPDATE SET
                    pieces_earned = reward_progress.pieces_earned + 1
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(log.user_id)
            .bind(reward_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?;
            Some(progress)
        } else {
            None
        };

        let inserted = sqlx::query_as::<_, HabitLog>(
            r#"
            INSERT INTO habit_logs
                (id, user_id, habit_id, reward_id, created_at, got_reward, streak_count, habit_weight, total_applied_weight, last_completed_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(log.habit_id)
        .bind(log.reward_id)
        .bind(log.created_at)
        .bind(log.got_reward)
        .bind(log.streak_count)
        .bind(log.habit_weight)
        .bind(log.total_applied_weight)
        .bind(log.last_completed_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict("log already exists for this date".into())
            }
            _ => RepoError::Backend(e.into()),
        })?;

        tx.commit().await.map_err(|e| RepoError::Backend(e.into()))?;
        Ok((inserted, progress))
    }

    async fn commit_revert(&self, log_id: Uuid) -> RepoResult<(HabitLog, Option<RewardProgress>)> {
        let mut tx = self.pool.begin().await.map_err(|e| RepoError::Backend(e.into()))?;

        let deleted = sqlx::query_as::<_, HabitLog>("DELETE FROM habit_logs WHERE id = $1 RETURNING *")
            .bind(log_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?
            .ok_or(RepoError::NotFound)?;

        let progress = if deleted.got_reward {
            if let Some(reward_id) = deleted.reward_id {
                sqlx::query_as::<_, RewardProgress>(
                    r#"
                    UPDATE reward_progress SET
                        pieces_earned = GREATEST(0, pieces_earned - 1),
                        claimed = false
                    WHERE user_id = $1 AND reward_id = $2
                    RETURNING *
                    "#,
                )
                .bind(deleted.user_id)
                .bind(reward_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| RepoError::Backend(e.into()))?
            } else {
                None
            }
        } else {
            None
        };

        tx.commit().await.map_err(|e| RepoError::Backend(e.into()))?;
        Ok((deleted, progress))
    }
}
