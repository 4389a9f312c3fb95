use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A daily trackable behavior owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub weight: i32,
    pub category: Option<String>,
    pub allowed_skip_days: i32,
    /// ISO weekday numbers (1=Monday..7=Sunday) exempt from streak misses.
    pub exempt_weekdays: Vec<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    pub fn created_date(&self) -> chrono::NaiveDate {
        self.created_at.date_naive()
    }

    pub fn exempt(&self, iso_weekday: u32) -> bool {
        self.exempt_weekdays.contains(&(iso_weekday as i32))
    }
}
