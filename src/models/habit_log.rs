use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable completion record. Inserted by the completion engine, deleted
/// only by the revert engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HabitLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub habit_id: Uuid,
    pub reward_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub got_reward: bool,
    pub streak_count: i32,
    pub habit_weight: i32,
    pub total_applied_weight: f64,
    pub last_completed_date: NaiveDate,
}
