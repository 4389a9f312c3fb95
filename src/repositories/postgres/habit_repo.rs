use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::habit::Habit;
use crate::repositories::HabitStore;

pub struct PgHabitStore {
    pub pool: PgPool,
}

#[async_trait]
impl HabitStore for PgHabitStore {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Habit> {
        sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_name(&self, user_id: Uuid, name: &str) -> RepoResult<Habit> {
        sqlx::query_as::<_, Habit>(
            "SELECT * FROM habits WHERE user_id = $1 AND name = $2 AND active = true",
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))?
        .ok_or(RepoError::NotFound)
    }

    async fn list(&self, user_id: Uuid, active: Option<bool>, category: Option<&str>) -> RepoResult<Vec<Habit>> {
        sqlx::query_as::<_, Habit>(
            r#"
            SELECT * FROM habits
            WHERE user_id = $1
              AND ($2::boolean IS NULL OR active = $2)
              AND ($3::text IS NULL OR category = $3)
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(active)
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Backend(e.into()))
    }

    async fn create(&self, habit: Habit) -> RepoResult<Habit> {
        sqlx::query_as::<_, Habit>(
            r#"
            INSERT INTO habits (id, user_id, name, weight, category, allowed_skip_days, exempt_weekdays, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(habit.id)
        .bind(habit.user_id)
        .bind(&habit.name)
        .bind(habit.weight)
        .bind(&habit.category)
        .bind(habit.allowed_skip_days)
        .bind(&habit.exempt_weekdays)
        .bind(habit.active)
        .bind(habit.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict("habit name already exists for this user".into())
            }
            _ => RepoError::Backend(e.into()),
        })
    }

    async fn update(&self, habit: Habit) -> RepoResult<Habit> {
        sqlx::query_as::<_, Habit>(
            r#"
            UPDATE habits SET
                name = $2,
                weight = $3,
                category = $4,
                allowed_skip_days = $5,
                exempt_weekdays = $6,
                active = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(habit.id)
        .bind(&habit.name)
        .bind(habit.weight)
        .bind(&habit.category)
        .bind(habit.allowed_skip_days)
        .bind(&habit.exempt_weekdays)
        .bind(habit.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict("habit name already exists for this user".into())
            }
            _ => RepoError::Backend(e.into()),
        })?
        .ok_or(RepoError::NotFound)
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<()> {
        sqlx::query("UPDATE habits SET active = false WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Backend(e.into()))?;
        Ok(())
    }
}
