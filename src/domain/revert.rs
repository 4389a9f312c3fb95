//! The revert engine, the inverse of the completion engine. Deliberately
//! does not trigger suffix recomputation (mirrors the behavior this was
//! distilled from); see the design notes for the resulting divergence in
//! streak accuracy after a revert.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::error::{not_found_as, DomainError, OpError};
use crate::models::audit_log::AuditEventKind;
use crate::models::habit_log::HabitLog;
use crate::models::user::User;
use crate::repositories::{AuditStore, CompletionStore, HabitStore, LogStore, RewardStore, UserStore};

pub struct RevertEngine {
    pub users: Arc<dyn UserStore>,
    pub habits: Arc<dyn HabitStore>,
    pub logs: Arc<dyn LogStore>,
    pub rewards: Arc<dyn RewardStore>,
    pub audit: Arc<dyn AuditStore>,
    pub completions: Arc<dyn CompletionStore>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RevertResult {
    pub habit_name: String,
    pub reward_reverted: bool,
    pub reward_name: Option<String>,
    pub pieces_earned_after: Option<i32>,
    pub success: bool,
}

impl RevertEngine {
    pub async fn revert_latest(&self, telegram_id: &str, habit_id: Uuid) -> Result<RevertResult, OpError> {
        let user = self
            .users
            .find_by_telegram_id(telegram_id)
            .await
            .map_err(not_found_as(DomainError::UserNotFound))?;
        let latest = self.logs.find_latest(user.id, habit_id).await?;
        self.revert(&user, habit_id, latest).await
    }

    pub async fn revert_by_log_id(&self, user_id: Uuid, log_id: Uuid) -> Result<RevertResult, OpError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(not_found_as(DomainError::UserNotFound))?;
        let log = self
            .logs
            .find_by_id(log_id)
            .await
            .map_err(not_found_as(DomainError::LogNotFound))?;
        if log.user_id != user.id {
            return Err(DomainError::NotOwner.into());
        }
        self.revert(&user, log.habit_id, Some(log)).await
    }

    async fn revert(
        &self,
        user: &User,
        habit_id: Uuid,
        log: Option<HabitLog>,
    ) -> Result<RevertResult, OpError> {
        if !user.active {
            return Err(DomainError::UserInactive.into());
        }
        let habit = self
            .habits
            .find_by_id(habit_id)
            .await
            .map_err(not_found_as(DomainError::HabitNotFound))?;
        let Some(log) = log else {
            return Err(DomainError::NothingToRevert.into());
        };

        let (log, progress_after) = self.completions.commit_revert(log.id).await?;
        let reward_name = match log.reward_id {
            Some(reward_id) => Some(self.rewards.find_by_id(reward_id).await?.name),
            None => None,
        };

        self.audit
            .log(
                user.id,
                AuditEventKind::RewardReverted,
                Some(habit.id),
                log.reward_id,
                Some(log.id),
                serde_json::json!({
                    "habit_name": habit.name,
                    "reward_reverted": log.got_reward,
                    "pieces_earned_after": progress_after.as_ref().map(|p| p.pieces_earned),
                }),
                None,
            )
            .await?;

        Ok(RevertResult {
            habit_name: habit.name,
            reward_reverted: log.got_reward,
            reward_name,
            pieces_earned_after: progress_after.map(|p| p.pieces_earned),
            success: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::OpError;
    use crate::domain::test_support::FakeStore;
    use crate::models::habit::Habit;
    use crate::models::reward::Reward;
    use crate::models::reward_progress::RewardProgress;
    use chrono::{NaiveDate, Utc};

    fn engine(store: &FakeStore) -> RevertEngine {
        RevertEngine {
            users: Arc::new(store.clone()),
            habits: Arc::new(store.clone()),
            logs: Arc::new(store.clone()),
            rewards: Arc::new(store.clone()),
            audit: Arc::new(store.clone()),
            completions: Arc::new(store.clone()),
        }
    }

    fn seeded_user(store: &FakeStore) -> User {
        let u = User {
            id: Uuid::new_v4(),
            telegram_id: "tg-revert".into(),
            name: "tester".into(),
            language: "en".into(),
            timezone: "UTC".into(),
            active: true,
            created_at: Utc::now() - chrono::Duration::days(365),
        };
        store.put_user(u.clone());
        u
    }

    #[tokio::test]
    async fn revert_with_reward_decrements_progress_and_deletes_log() {
        let store = FakeStore::new();
        let u = seeded_user(&store);
        let h = Habit {
            id: Uuid::new_v4(),
            user_id: u.id,
            name: "read".into(),
            weight: 10,
            category: None,
            allowed_skip_days: 0,
            exempt_weekdays: vec![],
            active: true,
            created_at: Utc::now() - chrono::Duration::days(30),
        };
        store.put_habit(h.clone());

        let r = Reward {
            id: Uuid::new_v4(),
            user_id: u.id,
            name: "prize".into(),
            weight: 5.0,
            pieces_required: 5,
            piece_value: None,
            max_daily_claims: None,
            active: true,
        };
        store.put_reward(r.clone());

        {
            let mut db = store.0.lock().unwrap();
            db.progress.insert(
                (u.id, r.id),
                RewardProgress { id: Uuid::new_v4(), user_id: u.id, reward_id: r.id, pieces_earned: 3, claimed: false },
            );
        }

        let log_id = Uuid::new_v4();
        store.put_log(HabitLog {
            id: log_id,
            user_id: u.id,
            habit_id: h.id,
            reward_id: Some(r.id),
            created_at: Utc::now(),
            got_reward: true,
            streak_count: 4,
            habit_weight: h.weight,
            total_applied_weight: 14.0,
            last_completed_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        });

        let engine = engine(&store);
        let result = engine.revert_by_log_id(u.id, log_id).await.unwrap();

        assert!(result.success);
        assert!(result.reward_reverted);
        assert_eq!(result.pieces_earned_after, Some(2));

        let db = store.0.lock().unwrap();
        assert!(db.logs.iter().all(|l| l.id != log_id));
        assert_eq!(db.progress.get(&(u.id, r.id)).unwrap().pieces_earned, 2);
    }

    #[tokio::test]
    async fn reverting_when_nothing_to_revert_fails() {
        let store = FakeStore::new();
        let u = seeded_user(&store);
        let h = Habit {
            id: Uuid::new_v4(),
            user_id: u.id,
            name: "read".into(),
            weight: 10,
            category: None,
            allowed_skip_days: 0,
            exempt_weekdays: vec![],
            active: true,
            created_at: Utc::now() - chrono::Duration::days(30),
        };
        store.put_habit(h.clone());

        let engine = engine(&store);
        let err = engine.revert_latest(&u.telegram_id, h.id).await.unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::NothingToRevert)));
    }

    #[tokio::test]
    async fn revert_by_log_id_rejects_non_owner() {
        let store = FakeStore::new();
        let owner = seeded_user(&store);
        let intruder = User {
            id: Uuid::new_v4(),
            telegram_id: "tg-intruder".into(),
            name: "intruder".into(),
            language: "en".into(),
            timezone: "UTC".into(),
            active: true,
            created_at: Utc::now() - chrono::Duration::days(365),
        };
        store.put_user(intruder.clone());

        let h = Habit {
            id: Uuid::new_v4(),
            user_id: owner.id,
            name: "read".into(),
            weight: 10,
            category: None,
            allowed_skip_days: 0,
            exempt_weekdays: vec![],
            active: true,
            created_at: Utc::now() - chrono::Duration::days(30),
        };
        store.put_habit(h.clone());

        let log_id = Uuid::new_v4();
        store.put_log(HabitLog {
            id: log_id,
            user_id: owner.id,
            habit_id: h.id,
            reward_id: None,
            created_at: Utc::now(),
            got_reward: false,
            streak_count: 1,
            habit_weight: h.weight,
            total_applied_weight: 10.0,
            last_completed_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        });

        let engine = engine(&store);
        let err = engine.revert_by_log_id(intruder.id, log_id).await.unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::NotOwner)));
    }
}
