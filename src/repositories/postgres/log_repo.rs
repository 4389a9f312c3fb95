use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::habit_log::HabitLog;
use crate::repositories::LogStore;

pub struct PgLogStore {
    pub pool: PgPool,
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn find_latest_before(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        date: NaiveDate,
    ) -> RepoResult<Option<HabitLog>> {
        sqlx::query_as::<_, HabitLog>(
            r#"
            SELECT * FROM habit_logs
            WHERE user_id = $1 AND habit_id = $2 AND last_completed_date < $3
            ORDER BY last_completed_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(habit_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn find_latest(&self, user_id: Uuid, habit_id: Uuid) -> RepoResult<Option<HabitLog>> {
        sqlx::query_as::<_, HabitLog>(
            r#"
            SELECT * FROM habit_logs
            WHERE user_id = $1 AND habit_id = $2
            ORDER BY last_completed_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(habit_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn find_for_date(&self, user_id: Uuid, habit_id: Uuid, date: NaiveDate) -> RepoResult<Option<HabitLog>> {
        sqlx::query_as::<_, HabitLog>(
            "SELECT * FROM habit_logs WHERE user_id = $1 AND habit_id = $2 AND last_completed_date = $3",
        )
        .bind(user_id)
        .bind(habit_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<HabitLog> {
        sqlx::query_as::<_, HabitLog>("SELECT * FROM habit_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?
            .ok_or(RepoError::NotFound)
    }

    async fn range(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<HabitLog>> {
        sqlx::query_as::<_, HabitLog>(
            r#"
            SELECT * FROM habit_logs
            WHERE user_id = $1 AND habit_id = $2 AND last_completed_date BETWEEN $3 AND $4
            ORDER BY last_completed_date ASC
            "#,
        )
        .bind(user_id)
        .bind(habit_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn list(
        &self,
        user_id: Uuid,
        habit_id: Option<Uuid>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<HabitLog>> {
        sqlx::query_as::<_, HabitLog>(
            r#"
            SELECT * FROM habit_logs
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR habit_id = $2)
              AND ($3::date IS NULL OR last_completed_date >= $3)
              AND ($4::date IS NULL OR last_completed_date <= $4)
            ORDER BY last_completed_date DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(user_id)
        .bind(habit_id)
        .bind(start_date)
        .bind(end_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn insert(&self, log: HabitLog) -> RepoResult<HabitLog> {
        sqlx::query_as::<_, HabitLog>(
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
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict("log already exists for this date".into())
            }
            _ => RepoError::Backend(e.into()),
        })
    }

    async fn update_streak(&self, id: Uuid, streak_count: i32) -> RepoResult<()> {
        sqlx::query("UPDATE habit_logs SET streak_count = $2 WHERE id = $1")
            .bind(id)
            .bind(streak_count)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepoResult<HabitLog> {
        sqlx::query_as::<_, HabitLog>("DELETE FROM habit_logs WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?
            .ok_or(RepoError::NotFound)
    }
}
