//! The habit-completion engine. Orchestrates validation, the
//! streak/reward computation (outside any transaction, so a retry never
//! re-draws), the atomic write, and the post-transaction suffix recompute.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::domain::error::{not_found_as, DomainError, OpError};
use crate::domain::{clock, reward_selector, streak};
use crate::models::audit_log::AuditEventKind;
use crate::models::habit::Habit;
use crate::models::habit_log::HabitLog;
use crate::models::reward::Reward;
use crate::models::user::User;
use crate::repositories::{
    AuditStore, CompletionStore, HabitStore, LogStore, ProgressStore, RewardStore, UserStore,
};

pub struct CompletionEngine {
    pub users: Arc<dyn UserStore>,
    pub habits: Arc<dyn HabitStore>,
    pub rewards: Arc<dyn RewardStore>,
    pub progress: Arc<dyn ProgressStore>,
    pub logs: Arc<dyn LogStore>,
    pub audit: Arc<dyn AuditStore>,
    pub completions: Arc<dyn CompletionStore>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CompletionResult {
    pub habit_confirmed: bool,
    pub habit_name: String,
    pub reward: Option<RewardSummary>,
    pub streak: i32,
    pub cumulative_progress: Option<ProgressSummary>,
    pub got_reward: bool,
    pub total_weight: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RewardSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressSummary {
    pub pieces_earned: i32,
    pub pieces_required: i32,
    pub claimed: bool,
}

impl CompletionEngine {
    pub async fn process_completion(
        &self,
        telegram_id: &str,
        habit_name: &str,
        target_date: Option<NaiveDate>,
        timezone: &str,
        rng: &mut impl Rng,
    ) -> Result<CompletionResult, OpError> {
        let user = self
            .users
            .find_by_telegram_id(telegram_id)
            .await
            .map_err(not_found_as(DomainError::UserNotFound))?;
        self.process_completion_for_user(&user, habit_name, target_date, timezone, rng)
            .await
    }

    pub async fn process_completion_for_user(
        &self,
        user: &User,
        habit_name: &str,
        target_date: Option<NaiveDate>,
        timezone: &str,
        rng: &mut impl Rng,
    ) -> Result<CompletionResult, OpError> {
        if !user.active {
            return Err(DomainError::UserInactive.into());
        }

        let habit = self
            .habits
            .find_by_name(user.id, habit_name)
            .await
            .map_err(not_found_as(DomainError::HabitNotFound))?;
        if !habit.active {
            return Err(DomainError::HabitNotFound.into());
        }

        let today = clock::user_today(timezone);
        let target_date = target_date.unwrap_or(today);
        validate_target_date(&habit, target_date, today)?;

        if self
            .logs
            .find_for_date(user.id, habit.id, target_date)
            .await?
            .is_some()
        {
            return Err(DomainError::AlreadyCompleted.into());
        }

        let predecessor = self
            .logs
            .find_latest_before(user.id, habit.id, target_date)
            .await?;
        let streak_count = streak::streak_for(&habit, predecessor.as_ref(), target_date);

        let active_rewards = self.rewards.list_active(user.id).await?;
        let claims_today = self.rewards.claims_on(user.id, today).await?;
        let eligible = reward_selector::eligible_today(&active_rewards, &claims_today);
        let weight = reward_selector::total_weight(habit.weight, streak_count);
        let drawn = reward_selector::select_reward(&eligible, weight, rng);
        let got_reward = drawn.got_reward();

        let log = HabitLog {
            id: Uuid::new_v4(),
            user_id: user.id,
            habit_id: habit.id,
            reward_id: drawn.reward.as_ref().map(|r| r.id),
            created_at: Utc::now(),
            got_reward,
            streak_count,
            habit_weight: habit.weight,
            total_applied_weight: weight,
            last_completed_date: target_date,
        };

        let (log, cumulative) = self
            .completions
            .commit_completion(log, drawn.reward.as_ref().map(|r| r.id))
            .await?;

        if target_date < today {
            self.recompute_suffix(user.id, &habit, target_date, today)
                .await?;
        }

        let reward_summary = drawn.reward.as_ref().map(|r| RewardSummary {
            id: r.id,
            name: r.name.clone(),
        });
        let progress_summary = cumulative
            .as_ref()
            .zip(drawn.reward.as_ref())
            .map(|(p, r)| ProgressSummary {
                pieces_earned: p.pieces_earned,
                pieces_required: r.pieces_required,
                claimed: p.claimed,
            });

        self.audit
            .log(
                user.id,
                AuditEventKind::HabitCompleted,
                Some(habit.id),
                drawn.reward.as_ref().map(|r| r.id),
                Some(log.id),
                completion_snapshot(&habit, streak_count, weight, &drawn.reward, &progress_summary),
                None,
            )
            .await?;

        Ok(CompletionResult {
            habit_confirmed: true,
            habit_name: habit.name.clone(),
            reward: reward_summary,
            streak: streak_count,
            cumulative_progress: progress_summary,
            got_reward,
            total_weight: weight,
        })
    }

    /// Re-derives `streak_count` for every log between `from` and `today`
    /// inclusive, persisting only the values that changed. Required after a
    /// backdated insertion so later logs' streaks stay consistent.
    async fn recompute_suffix(
        &self,
        user_id: Uuid,
        habit: &Habit,
        from: NaiveDate,
        today: NaiveDate,
    ) -> Result<(), OpError> {
        let mut suffix = self.logs.range(user_id, habit.id, from, today).await?;
        suffix.sort_by_key(|l| l.last_completed_date);

        let mut predecessor = self
            .logs
            .find_latest_before(user_id, habit.id, from)
            .await?;

        for entry in suffix.iter() {
            let recomputed =
                streak::streak_for(habit, predecessor.as_ref(), entry.last_completed_date);
            if recomputed != entry.streak_count {
                self.logs.update_streak(entry.id, recomputed).await?;
            }
            let mut updated = entry.clone();
            updated.streak_count = recomputed;
            predecessor = Some(updated);
        }
        Ok(())
    }
}

fn validate_target_date(
    habit: &Habit,
    target_date: NaiveDate,
    today: NaiveDate,
) -> Result<(), DomainError> {
    let earliest = today - chrono::Duration::days(7);
    if target_date > today {
        return Err(DomainError::FutureDate);
    }
    if target_date < earliest {
        return Err(DomainError::TooOld);
    }
    if target_date < habit.created_date() {
        return Err(DomainError::BeforeHabitCreation);
    }
    Ok(())
}

fn completion_snapshot(
    habit: &Habit,
    streak_count: i32,
    total_weight: f64,
    reward: &Option<Reward>,
    progress: &Option<ProgressSummary>,
) -> serde_json::Value {
    serde_json::json!({
        "habit_name": habit.name,
        "streak": streak_count,
        "total_weight": total_weight,
        "selected_reward_name": reward.as_ref().map(|r| r.name.clone()),
        "reward_progress": progress.as_ref().map(|p| serde_json::json!({
            "pieces_earned": p.pieces_earned,
            "pieces_required": p.pieces_required,
            "claimed": p.claimed,
        })),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::FakeStore;
    use rand::rngs::mock::StepRng;

    fn engine(store: &FakeStore) -> CompletionEngine {
        CompletionEngine {
            users: Arc::new(store.clone()),
            habits: Arc::new(store.clone()),
            rewards: Arc::new(store.clone()),
            progress: Arc::new(store.clone()),
            logs: Arc::new(store.clone()),
            audit: Arc::new(store.clone()),
            completions: Arc::new(store.clone()),
        }
    }

    fn user(store: &FakeStore, telegram_id: &str) -> User {
        let u = User {
            id: Uuid::new_v4(),
            telegram_id: telegram_id.to_string(),
            name: "tester".into(),
            language: "en".into(),
            timezone: "UTC".into(),
            active: true,
            created_at: Utc::now() - chrono::Duration::days(365),
        };
        store.put_user(u.clone());
        u
    }

    fn habit(store: &FakeStore, user_id: Uuid, name: &str, weight: i32, allowed_skip_days: i32, exempt: Vec<i32>) -> Habit {
        let h = Habit {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            weight,
            category: None,
            allowed_skip_days,
            exempt_weekdays: exempt,
            active: true,
            created_at: Utc::now() - chrono::Duration::days(365),
        };
        store.put_habit(h.clone());
        h
    }

    #[tokio::test]
    async fn first_ever_completion_has_streak_one_and_no_reward() {
        let store = FakeStore::new();
        let u = user(&store, "tg-1");
        let h = habit(&store, u.id, "read", 10, 0, vec![]);
        let engine = engine(&store);

        let target = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let mut rng = StepRng::new(0, 0);
        let result = engine
            .process_completion_for_user(&u, &h.name, Some(target), "UTC", &mut rng)
            .await
            .unwrap();

        assert!(result.habit_confirmed);
        assert_eq!(result.streak, 1);
        assert!(!result.got_reward);
        assert_eq!(result.total_weight, 11.0);
    }

    #[tokio::test]
    async fn second_completion_same_day_is_rejected() {
        let store = FakeStore::new();
        let u = user(&store, "tg-2");
        let h = habit(&store, u.id, "read", 10, 0, vec![]);
        let engine = engine(&store);

        let target = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let mut rng = StepRng::new(0, 0);
        engine
            .process_completion_for_user(&u, &h.name, Some(target), "UTC", &mut rng)
            .await
            .unwrap();

        let err = engine
            .process_completion_for_user(&u, &h.name, Some(target), "UTC", &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::AlreadyCompleted)));
    }

    #[tokio::test]
    async fn future_date_is_rejected() {
        let store = FakeStore::new();
        let u = user(&store, "tg-3");
        let h = habit(&store, u.id, "read", 10, 0, vec![]);
        let engine = engine(&store);

        let future = crate::domain::clock::user_today("UTC") + chrono::Duration::days(1);
        let mut rng = StepRng::new(0, 0);
        let err = engine
            .process_completion_for_user(&u, &h.name, Some(future), "UTC", &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::FutureDate)));
    }

    #[tokio::test]
    async fn date_more_than_seven_days_old_is_rejected() {
        let store = FakeStore::new();
        let u = user(&store, "tg-4");
        let h = habit(&store, u.id, "read", 10, 0, vec![]);
        let engine = engine(&store);

        let too_old = crate::domain::clock::user_today("UTC") - chrono::Duration::days(8);
        let mut rng = StepRng::new(0, 0);
        let err = engine
            .process_completion_for_user(&u, &h.name, Some(too_old), "UTC", &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::TooOld)));
    }

    #[tokio::test]
    async fn date_before_habit_creation_is_rejected() {
        let store = FakeStore::new();
        let u = user(&store, "tg-5");
        let mut h = habit(&store, u.id, "read", 10, 0, vec![]);
        h.created_at = Utc::now() - chrono::Duration::days(2);
        store.put_habit(h.clone());
        let engine = engine(&store);

        let before = h.created_date() - chrono::Duration::days(1);
        let mut rng = StepRng::new(0, 0);
        let err = engine
            .process_completion_for_user(&u, &h.name, Some(before), "UTC", &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::BeforeHabitCreation)));
    }

    #[tokio::test]
    async fn backdated_completion_recomputes_suffix_streaks() {
        let store = FakeStore::new();
        let u = user(&store, "tg-6");
        let h = habit(&store, u.id, "read", 10, 1, vec![]);
        let engine = engine(&store);

        let d10 = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let d12 = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        let d11 = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();

        store.put_log(HabitLog {
            id: Uuid::new_v4(),
            user_id: u.id,
            habit_id: h.id,
            reward_id: None,
            created_at: Utc::now(),
            got_reward: false,
            streak_count: 1,
            habit_weight: h.weight,
            total_applied_weight: 11.0,
            last_completed_date: d10,
        });
        store.put_log(HabitLog {
            id: Uuid::new_v4(),
            user_id: u.id,
            habit_id: h.id,
            reward_id: None,
            created_at: Utc::now(),
            got_reward: false,
            streak_count: 1,
            habit_weight: h.weight,
            total_applied_weight: 11.0,
            last_completed_date: d12,
        });

        let mut rng = StepRng::new(0, 0);
        let result = engine
            .process_completion_for_user(&u, &h.name, Some(d11), "UTC", &mut rng)
            .await
            .unwrap();
        assert_eq!(result.streak, 2);

        let updated_d12 = store
            .0
            .lock()
            .unwrap()
            .logs
            .iter()
            .find(|l| l.last_completed_date == d12)
            .unwrap()
            .streak_count;
        assert_eq!(updated_d12, 3);

        let untouched_d10 = store
            .0
            .lock()
            .unwrap()
            .logs
            .iter()
            .find(|l| l.last_completed_date == d10)
            .unwrap()
            .streak_count;
        assert_eq!(untouched_d10, 1);
    }

    #[tokio::test]
    async fn reward_draw_skips_rewards_with_exhausted_daily_quota() {
        let store = FakeStore::new();
        let u = user(&store, "tg-7");
        let h = habit(&store, u.id, "read", 10, 0, vec![]);
        let other_habit = habit(&store, u.id, "stretch", 10, 0, vec![]);
        let engine = engine(&store);

        let exhausted = Reward {
            id: Uuid::new_v4(),
            user_id: u.id,
            name: "sticker".into(),
            weight: 5.0,
            pieces_required: 1,
            piece_value: None,
            max_daily_claims: Some(1),
            active: true,
        };
        store.put_reward(exhausted.clone());

        let today = crate::domain::clock::user_today("UTC");
        store.put_log(HabitLog {
            id: Uuid::new_v4(),
            user_id: u.id,
            habit_id: other_habit.id,
            reward_id: Some(exhausted.id),
            created_at: Utc::now(),
            got_reward: true,
            streak_count: 1,
            habit_weight: other_habit.weight,
            total_applied_weight: 11.0,
            last_completed_date: today,
        });

        let mut rng = StepRng::new(0, 0);
        let result = engine
            .process_completion_for_user(&u, &h.name, Some(today), "UTC", &mut rng)
            .await
            .unwrap();

        // the only reward's quota is already spent today, so the sentinel wins
        assert!(!result.got_reward);
        assert!(result.reward.is_none());
    }
}
