//! Narrow, per-entity persistence interfaces. The domain layer depends only
//! on these traits, never on `sqlx` directly — the only concrete
//! implementation shipped is `postgres`, but any fake can be substituted in
//! tests through the same constructor path.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::error::RepoResult;
use crate::models::api_key::ApiKey;
use crate::models::audit_log::{AuditEventKind, AuditLog};
use crate::models::auth_code::AuthCode;
use crate::models::habit::Habit;
use crate::models::habit_log::HabitLog;
use crate::models::reward::Reward;
use crate::models::reward_progress::RewardProgress;
use crate::models::user::User;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_telegram_id(&self, telegram_id: &str) -> RepoResult<User>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<User>;
    async fn update_profile(&self, id: Uuid, name: Option<&str>, language: Option<&str>) -> RepoResult<User>;
}

#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Habit>;
    async fn find_by_name(&self, user_id: Uuid, name: &str) -> RepoResult<Habit>;
    async fn list(&self, user_id: Uuid, active: Option<bool>, category: Option<&str>) -> RepoResult<Vec<Habit>>;
    async fn create(&self, habit: Habit) -> RepoResult<Habit>;
    async fn update(&self, habit: Habit) -> RepoResult<Habit>;
    async fn soft_delete(&self, id: Uuid) -> RepoResult<()>;
}

#[async_trait]
pub trait RewardStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Reward>;
    async fn find_by_name(&self, user_id: Uuid, name: &str) -> RepoResult<Reward>;
    async fn list_active(&self, user_id: Uuid) -> RepoResult<Vec<Reward>>;
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<Reward>>;
    async fn create(&self, reward: Reward) -> RepoResult<Reward>;
    /// Count of distinct `HabitLog` rows crediting `reward_id` on `date`
    /// (used to enforce the per-day claim quota at draw time).
    async fn claims_on(&self, user_id: Uuid, date: NaiveDate) -> RepoResult<std::collections::HashMap<Uuid, i32>>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn find(&self, user_id: Uuid, reward_id: Uuid) -> RepoResult<Option<RewardProgress>>;
    async fn upsert(&self, progress: RewardProgress) -> RepoResult<RewardProgress>;
    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<RewardProgress>>;
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn find_latest_before(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        date: NaiveDate,
    ) -> RepoResult<Option<HabitLog>>;
    async fn find_latest(&self, user_id: Uuid, habit_id: Uuid) -> RepoResult<Option<HabitLog>>;
    async fn find_for_date(&self, user_id: Uuid, habit_id: Uuid, date: NaiveDate) -> RepoResult<Option<HabitLog>>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<HabitLog>;
    async fn range(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<HabitLog>>;
    async fn list(
        &self,
        user_id: Uuid,
        habit_id: Option<Uuid>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<HabitLog>>;
    async fn insert(&self, log: HabitLog) -> RepoResult<HabitLog>;
    async fn update_streak(&self, id: Uuid, streak_count: i32) -> RepoResult<()>;
    async fn delete(&self, id: Uuid) -> RepoResult<HabitLog>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn log(
        &self,
        user_id: Uuid,
        kind: AuditEventKind,
        habit_id: Option<Uuid>,
        reward_id: Option<Uuid>,
        log_id: Option<Uuid>,
        payload: serde_json::Value,
        error_message: Option<String>,
    ) -> RepoResult<AuditLog>;
    async fn timeline(&self, user_id: Uuid, hours_back: i64) -> RepoResult<Vec<AuditLog>>;
    async fn trace_reward(&self, user_id: Uuid, reward_id: Uuid) -> RepoResult<Vec<AuditLog>>;
    async fn cleanup(&self, older_than_days: i64) -> RepoResult<u64>;
}

#[async_trait]
pub trait AuthCodeStore: Send + Sync {
    async fn count_issued_since(&self, user_id: Uuid, since: DateTime<Utc>) -> RepoResult<i64>;
    async fn invalidate_unused(&self, user_id: Uuid) -> RepoResult<()>;
    async fn insert(&self, code: AuthCode) -> RepoResult<AuthCode>;
    /// Conditionally marks a matching, unused, unexpired, unlocked code as
    /// used. Returns `None` if nothing matched (the conditional update
    /// affected zero rows).
    async fn try_consume(&self, user_id: Uuid, code: &str, now: DateTime<Utc>) -> RepoResult<Option<AuthCode>>;
    async fn find_latest_active(&self, user_id: Uuid, now: DateTime<Utc>) -> RepoResult<Option<AuthCode>>;
    async fn record_failed_attempt(
        &self,
        id: Uuid,
        failed_attempts: i32,
        lock_until: Option<DateTime<Utc>>,
    ) -> RepoResult<()>;
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}

/// The one interface whose implementation must be transactional: committing
/// a completion (log insert + progress increment) or a revert (log delete +
/// progress decrement) as a single atomic unit. Kept separate from
/// `LogStore`/`ProgressStore` so those stay simple per-entity reads and
/// writes while this carries the cross-entity guarantee the completion and
/// revert engines need.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    async fn commit_completion(
        &self,
        log: HabitLog,
        reward_to_increment: Option<Uuid>,
    ) -> RepoResult<(HabitLog, Option<RewardProgress>)>;

    async fn commit_revert(&self, log_id: Uuid) -> RepoResult<(HabitLog, Option<RewardProgress>)>;
}

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn find_by_name(&self, user_id: Uuid, name: &str) -> RepoResult<Option<ApiKey>>;
    async fn create(&self, key: ApiKey) -> RepoResult<ApiKey>;
    async fn find_by_hash(&self, key_hash: &str) -> RepoResult<Option<ApiKey>>;
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<ApiKey>>;
    async fn revoke(&self, id: Uuid, user_id: Uuid) -> RepoResult<()>;
    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()>;
}
