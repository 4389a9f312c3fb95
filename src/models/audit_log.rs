use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_event_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    Command,
    HabitCompleted,
    RewardClaimed,
    RewardReverted,
    ButtonClick,
    Error,
}

/// Append-only record of a user-caused event. Written synchronously with the
/// event itself, swept on a retention schedule (default 90 days).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub event_kind: AuditEventKind,
    pub habit_id: Option<Uuid>,
    pub reward_id: Option<Uuid>,
    pub log_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub error_message: Option<String>,
}
