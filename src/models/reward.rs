use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A prize a user can draw on habit completion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reward {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub weight: f64,
    pub pieces_required: i32,
    pub piece_value: Option<f64>,
    pub max_daily_claims: Option<i32>,
    pub active: bool,
}

impl Reward {
    /// 1 piece required means the reward is granted whole the moment it's drawn.
    pub fn is_instant(&self) -> bool {
        self.pieces_required <= 1
    }

    pub fn unlimited_daily_claims(&self) -> bool {
        matches!(self.max_daily_claims, None | Some(0))
    }
}
