//! In-memory fakes for the repository traits, shared by the `#[cfg(test)]`
//! modules of the orchestration-level services (`CompletionEngine`,
//! `RevertEngine`, `AuthCodeService`, `ApiKeyService`). One `FakeDb` backs
//! every trait impl so a commit through `CompletionStore` is visible to
//! reads through `LogStore`/`ProgressStore`, the same way a transaction
//! commit is visible to the next query against a real pool.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::error::{RepoError, RepoResult};
use crate::models::api_key::ApiKey;
use crate::models::audit_log::{AuditEventKind, AuditLog};
use crate::models::auth_code::AuthCode;
use crate::models::habit::Habit;
use crate::models::habit_log::HabitLog;
use crate::models::reward::Reward;
use crate::models::reward_progress::RewardProgress;
use crate::models::user::User;
use crate::repositories::{
    ApiKeyStore, AuditStore, AuthCodeStore, CompletionStore, HabitStore, LogStore, ProgressStore,
    RewardStore, UserStore,
};

#[derive(Default)]
pub struct FakeDb {
    pub users: HashMap<Uuid, User>,
    pub habits: HashMap<Uuid, Habit>,
    pub rewards: HashMap<Uuid, Reward>,
    pub progress: HashMap<(Uuid, Uuid), RewardProgress>,
    pub logs: Vec<HabitLog>,
    pub audit: Vec<AuditLog>,
    pub auth_codes: Vec<AuthCode>,
    pub api_keys: Vec<ApiKey>,
}

#[derive(Clone, Default)]
pub struct FakeStore(pub Arc<Mutex<FakeDb>>);

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(&self, user: User) {
        self.0.lock().unwrap().users.insert(user.id, user);
    }

    pub fn put_habit(&self, habit: Habit) {
        self.0.lock().unwrap().habits.insert(habit.id, habit);
    }

    pub fn put_reward(&self, reward: Reward) {
        self.0.lock().unwrap().rewards.insert(reward.id, reward);
    }

    pub fn put_log(&self, log: HabitLog) {
        self.0.lock().unwrap().logs.push(log);
    }

    pub fn put_auth_code(&self, code: AuthCode) {
        self.0.lock().unwrap().auth_codes.push(code);
    }
}

#[async_trait]
impl UserStore for FakeStore {
    async fn find_by_telegram_id(&self, telegram_id: &str) -> RepoResult<User> {
        self.0
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.telegram_id == telegram_id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<User> {
        self.0.lock().unwrap().users.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn update_profile(&self, id: Uuid, name: Option<&str>, language: Option<&str>) -> RepoResult<User> {
        let mut db = self.0.lock().unwrap();
        let user = db.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(n) = name {
            user.name = n.to_string();
        }
        if let Some(l) = language {
            user.language = l.to_string();
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl HabitStore for FakeStore {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Habit> {
        self.0.lock().unwrap().habits.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn find_by_name(&self, user_id: Uuid, name: &str) -> RepoResult<Habit> {
        self.0
            .lock()
            .unwrap()
            .habits
            .values()
            .find(|h| h.user_id == user_id && h.name == name && h.active)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list(&self, user_id: Uuid, active: Option<bool>, category: Option<&str>) -> RepoResult<Vec<Habit>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .habits
            .values()
            .filter(|h| h.user_id == user_id)
            .filter(|h| active.map_or(true, |a| h.active == a))
            .filter(|h| category.is_none() || h.category.as_deref() == category)
            .cloned()
            .collect())
    }

    async fn create(&self, habit: Habit) -> RepoResult<Habit> {
        let mut db = self.0.lock().unwrap();
        if db.habits.values().any(|h| h.user_id == habit.user_id && h.name == habit.name) {
            return Err(RepoError::Conflict("habit name already exists".into()));
        }
        db.habits.insert(habit.id, habit.clone());
        Ok(habit)
    }

    async fn update(&self, habit: Habit) -> RepoResult<Habit> {
        let mut db = self.0.lock().unwrap();
        if !db.habits.contains_key(&habit.id) {
            return Err(RepoError::NotFound);
        }
        db.habits.insert(habit.id, habit.clone());
        Ok(habit)
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<()> {
        let mut db = self.0.lock().unwrap();
        let habit = db.habits.get_mut(&id).ok_or(RepoError::NotFound)?;
        habit.active = false;
        Ok(())
    }
}

#[async_trait]
impl RewardStore for FakeStore {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Reward> {
        self.0.lock().unwrap().rewards.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn find_by_name(&self, user_id: Uuid, name: &str) -> RepoResult<Reward> {
        self.0
            .lock()
            .unwrap()
            .rewards
            .values()
            .find(|r| r.user_id == user_id && r.name == name)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list_active(&self, user_id: Uuid) -> RepoResult<Vec<Reward>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .rewards
            .values()
            .filter(|r| r.user_id == user_id && r.active)
            .cloned()
            .collect())
    }

    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<Reward>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .rewards
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, reward: Reward) -> RepoResult<Reward> {
        let mut db = self.0.lock().unwrap();
        if db.rewards.values().any(|r| r.user_id == reward.user_id && r.name == reward.name) {
            return Err(RepoError::Conflict("reward name already exists".into()));
        }
        db.rewards.insert(reward.id, reward.clone());
        Ok(reward)
    }

    async fn claims_on(&self, user_id: Uuid, date: NaiveDate) -> RepoResult<HashMap<Uuid, i32>> {
        let db = self.0.lock().unwrap();
        let mut out: HashMap<Uuid, i32> = HashMap::new();
        for log in db.logs.iter().filter(|l| {
            l.user_id == user_id && l.last_completed_date == date && l.got_reward
        }) {
            if let Some(reward_id) = log.reward_id {
                *out.entry(reward_id).or_insert(0) += 1;
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ProgressStore for FakeStore {
    async fn find(&self, user_id: Uuid, reward_id: Uuid) -> RepoResult<Option<RewardProgress>> {
        Ok(self.0.lock().unwrap().progress.get(&(user_id, reward_id)).cloned())
    }

    async fn upsert(&self, progress: RewardProgress) -> RepoResult<RewardProgress> {
        let mut db = self.0.lock().unwrap();
        db.progress.insert((progress.user_id, progress.reward_id), progress.clone());
        Ok(progress)
    }

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<RewardProgress>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LogStore for FakeStore {
    async fn find_latest_before(&self, user_id: Uuid, habit_id: Uuid, date: NaiveDate) -> RepoResult<Option<HabitLog>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .logs
            .iter()
            .filter(|l| l.user_id == user_id && l.habit_id == habit_id && l.last_completed_date < date)
            .max_by_key(|l| l.last_completed_date)
            .cloned())
    }

    async fn find_latest(&self, user_id: Uuid, habit_id: Uuid) -> RepoResult<Option<HabitLog>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .logs
            .iter()
            .filter(|l| l.user_id == user_id && l.habit_id == habit_id)
            .max_by_key(|l| l.last_completed_date)
            .cloned())
    }

    async fn find_for_date(&self, user_id: Uuid, habit_id: Uuid, date: NaiveDate) -> RepoResult<Option<HabitLog>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .logs
            .iter()
            .find(|l| l.user_id == user_id && l.habit_id == habit_id && l.last_completed_date == date)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<HabitLog> {
        self.0
            .lock()
            .unwrap()
            .logs
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn range(&self, user_id: Uuid, habit_id: Uuid, from: NaiveDate, to: NaiveDate) -> RepoResult<Vec<HabitLog>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .logs
            .iter()
            .filter(|l| {
                l.user_id == user_id
                    && l.habit_id == habit_id
                    && l.last_completed_date >= from
                    && l.last_completed_date <= to
            })
            .cloned()
            .collect())
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
        let db = self.0.lock().unwrap();
        let mut logs: Vec<HabitLog> = db
            .logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .filter(|l| habit_id.map_or(true, |h| l.habit_id == h))
            .filter(|l| start_date.map_or(true, |d| l.last_completed_date >= d))
            .filter(|l| end_date.map_or(true, |d| l.last_completed_date <= d))
            .cloned()
            .collect();
        logs.sort_by_key(|l| std::cmp::Reverse(l.last_completed_date));
        Ok(logs.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn insert(&self, log: HabitLog) -> RepoResult<HabitLog> {
        let mut db = self.0.lock().unwrap();
        if db
            .logs
            .iter()
            .any(|l| l.user_id == log.user_id && l.habit_id == log.habit_id && l.last_completed_date == log.last_completed_date)
        {
            return Err(RepoError::Conflict("log already exists for this date".into()));
        }
        db.logs.push(log.clone());
        Ok(log)
    }

    async fn update_streak(&self, id: Uuid, streak_count: i32) -> RepoResult<()> {
        let mut db = self.0.lock().unwrap();
        let log = db.logs.iter_mut().find(|l| l.id == id).ok_or(RepoError::NotFound)?;
        log.streak_count = streak_count;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepoResult<HabitLog> {
        let mut db = self.0.lock().unwrap();
        let idx = db.logs.iter().position(|l| l.id == id).ok_or(RepoError::NotFound)?;
        Ok(db.logs.remove(idx))
    }
}

#[async_trait]
impl AuditStore for FakeStore {
    async fn log(
        &self,
        user_id: Uuid,
        kind: AuditEventKind,
        habit_id: Option<Uuid>,
        reward_id: Option<Uuid>,
        log_id: Option<Uuid>,
        payload: serde_json::Value,
        error_message: Option<String>,
    ) -> RepoResult<AuditLog> {
        let entry = AuditLog {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            user_id,
            event_kind: kind,
            habit_id,
            reward_id,
            log_id,
            payload,
            error_message,
        };
        self.0.lock().unwrap().audit.push(entry.clone());
        Ok(entry)
    }

    async fn timeline(&self, user_id: Uuid, _hours_back: i64) -> RepoResult<Vec<AuditLog>> {
        Ok(self.0.lock().unwrap().audit.iter().filter(|a| a.user_id == user_id).cloned().collect())
    }

    async fn trace_reward(&self, user_id: Uuid, reward_id: Uuid) -> RepoResult<Vec<AuditLog>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .audit
            .iter()
            .filter(|a| a.user_id == user_id && a.reward_id == Some(reward_id))
            .cloned()
            .collect())
    }

    async fn cleanup(&self, _older_than_days: i64) -> RepoResult<u64> {
        Ok(0)
    }
}

#[async_trait]
impl CompletionStore for FakeStore {
    async fn commit_completion(
        &self,
        log: HabitLog,
        reward_to_increment: Option<Uuid>,
    ) -> RepoResult<(HabitLog, Option<RewardProgress>)> {
        let mut db = self.0.lock().unwrap();
        if db
            .logs
            .iter()
            .any(|l| l.user_id == log.user_id && l.habit_id == log.habit_id && l.last_completed_date == log.last_completed_date)
        {
            return Err(RepoError::Conflict("log already exists for this date".into()));
        }

        let progress = reward_to_increment.map(|reward_id| {
            let key = (log.user_id, reward_id);
            let entry = db.progress.entry(key).or_insert(RewardProgress {
                id: Uuid::new_v4(),
                user_id: log.user_id,
                reward_id,
                pieces_earned: 0,
                claimed: false,
            });
            entry.pieces_earned += 1;
            entry.clone()
        });

        db.logs.push(log.clone());
        Ok((log, progress))
    }

    async fn commit_revert(&self, log_id: Uuid) -> RepoResult<(HabitLog, Option<RewardProgress>)> {
        let mut db = self.0.lock().unwrap();
        let idx = db.logs.iter().position(|l| l.id == log_id).ok_or(RepoError::NotFound)?;
        let deleted = db.logs.remove(idx);

        let progress = if deleted.got_reward {
            deleted.reward_id.and_then(|reward_id| {
                let key = (deleted.user_id, reward_id);
                db.progress.get_mut(&key).map(|p| {
                    p.pieces_earned = (p.pieces_earned - 1).max(0);
                    p.claimed = false;
                    p.clone()
                })
            })
        } else {
            None
        };

        Ok((deleted, progress))
    }
}

#[async_trait]
impl AuthCodeStore for FakeStore {
    async fn count_issued_since(&self, user_id: Uuid, since: DateTime<Utc>) -> RepoResult<i64> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .auth_codes
            .iter()
            .filter(|c| c.user_id == user_id && c.created_at >= since)
            .count() as i64)
    }

    async fn invalidate_unused(&self, user_id: Uuid) -> RepoResult<()> {
        let mut db = self.0.lock().unwrap();
        for code in db.auth_codes.iter_mut().filter(|c| c.user_id == user_id && !c.used) {
            code.used = true;
        }
        Ok(())
    }

    async fn insert(&self, code: AuthCode) -> RepoResult<AuthCode> {
        self.0.lock().unwrap().auth_codes.push(code.clone());
        Ok(code)
    }

    async fn try_consume(&self, user_id: Uuid, code: &str, now: DateTime<Utc>) -> RepoResult<Option<AuthCode>> {
        let mut db = self.0.lock().unwrap();
        let found = db.auth_codes.iter_mut().find(|c| {
            c.user_id == user_id
                && c.code == code
                && !c.used
                && c.expires_at > now
                && c.locked_until.map_or(true, |until| until <= now)
        });
        if let Some(c) = found {
            c.used = true;
            Ok(Some(c.clone()))
        } else {
            Ok(None)
        }
    }

    async fn find_latest_active(&self, user_id: Uuid, now: DateTime<Utc>) -> RepoResult<Option<AuthCode>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .auth_codes
            .iter()
            .filter(|c| c.user_id == user_id && !c.used && c.expires_at > now)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn record_failed_attempt(&self, id: Uuid, failed_attempts: i32, lock_until: Option<DateTime<Utc>>) -> RepoResult<()> {
        let mut db = self.0.lock().unwrap();
        let code = db.auth_codes.iter_mut().find(|c| c.id == id).ok_or(RepoError::NotFound)?;
        code.failed_attempts = failed_attempts;
        if lock_until.is_some() {
            code.locked_until = lock_until;
        }
        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let mut db = self.0.lock().unwrap();
        let before = db.auth_codes.len();
        db.auth_codes.retain(|c| c.expires_at >= now);
        Ok((before - db.auth_codes.len()) as u64)
    }
}

#[async_trait]
impl ApiKeyStore for FakeStore {
    async fn find_by_name(&self, user_id: Uuid, name: &str) -> RepoResult<Option<ApiKey>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .api_keys
            .iter()
            .find(|k| k.user_id == user_id && k.name == name)
            .cloned())
    }

    async fn create(&self, key: ApiKey) -> RepoResult<ApiKey> {
        self.0.lock().unwrap().api_keys.push(key.clone());
        Ok(key)
    }

    async fn find_by_hash(&self, key_hash: &str) -> RepoResult<Option<ApiKey>> {
        Ok(self.0.lock().unwrap().api_keys.iter().find(|k| k.key_hash == key_hash).cloned())
    }

    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<ApiKey>> {
        Ok(self.0.lock().unwrap().api_keys.iter().filter(|k| k.user_id == user_id).cloned().collect())
    }

    async fn revoke(&self, id: Uuid, user_id: Uuid) -> RepoResult<()> {
        let mut db = self.0.lock().unwrap();
        let key = db
            .api_keys
            .iter_mut()
            .find(|k| k.id == id && k.user_id == user_id)
            .ok_or(RepoError::NotFound)?;
        key.active = false;
        Ok(())
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        let mut db = self.0.lock().unwrap();
        let key = db.api_keys.iter_mut().find(|k| k.id == id).ok_or(RepoError::NotFound)?;
        key.last_used_at = Some(at);
        Ok(())
    }
}
