use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProgressStatus {
    Pending,
    Achieved,
    Claimed,
}

/// Per-user-per-reward accumulator. Unique on (user_id, reward_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RewardProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reward_id: Uuid,
    pub pieces_earned: i32,
    pub claimed: bool,
}

impl RewardProgress {
    pub fn status(&self, pieces_required: i32) -> ProgressStatus {
        if self.claimed {
            ProgressStatus::Claimed
        } else if self.pieces_earned >= pieces_required {
            ProgressStatus::Achieved
        } else {
            ProgressStatus::Pending
        }
    }
}
