//! Streak arithmetic. Pure functions operating on already-loaded rows;
//! the repository lookups live in `domain::completion` where the results
//! are needed alongside other loaded state.

use chrono::NaiveDate;

use crate::models::habit::Habit;
use crate::models::habit_log::HabitLog;

/// Streak that would apply to a completion on `target_date`, given the most
/// recent log strictly before it (`predecessor`), or `None` if there is none.
///
/// If `habit` could not be loaded, callers should treat the streak as broken
/// and pass `1` without calling this — kept as a caller responsibility since
/// this function requires a loaded `Habit` by construction.
pub fn streak_for(habit: &Habit, predecessor: Option<&HabitLog>, target_date: NaiveDate) -> i32 {
    let Some(prev) = predecessor else {
        return 1;
    };

    let gap_day_before = target_date - chrono::Duration::days(1);
    let prev_date = prev.last_completed_date;

    if prev_date == gap_day_before {
        return prev.streak_count + 1;
    }

    if prev_date < gap_day_before {
        let missed_days = (1..).map_while(|n| {
            let d = prev_date + chrono::Duration::days(n);
            if d < target_date {
                Some(d)
            } else {
                None
            }
        });
        let missed = missed_days
            .filter(|d| !habit.exempt(weekday_iso(*d)))
            .count() as i32;
        if missed <= habit.allowed_skip_days {
            return prev.streak_count + 1;
        }
        return 1;
    }

    tracing::warn!(
        habit_id = %habit.id,
        "streak predecessor's date is after target_date; duplicate-day guard should have prevented this"
    );
    1
}

/// The streak value already recorded for the most recent log, or 0 if none.
/// Reflects stored state — does not project a hypothetical new completion.
pub fn current_streak(latest: Option<&HabitLog>) -> i32 {
    latest.map(|l| l.streak_count).unwrap_or(0)
}

fn weekday_iso(date: NaiveDate) -> u32 {
    chrono::Datelike::weekday(&date).number_from_monday()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn habit(allowed_skip_days: i32, exempt_weekdays: Vec<i32>) -> Habit {
        Habit {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "read".into(),
            weight: 10,
            category: None,
            allowed_skip_days,
            exempt_weekdays,
            active: true,
            created_at: Utc::now() - chrono::Duration::days(365),
        }
    }

    fn log_on(date: NaiveDate, streak: i32) -> HabitLog {
        HabitLog {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            habit_id: Uuid::new_v4(),
            reward_id: None,
            created_at: Utc::now(),
            got_reward: false,
            streak_count: streak,
            habit_weight: 10,
            total_applied_weight: 10.0,
            last_completed_date: date,
        }
    }

    #[test]
    fn no_predecessor_starts_at_one() {
        let h = habit(0, vec![]);
        let target = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        assert_eq!(streak_for(&h, None, target), 1);
    }

    #[test]
    fn consecutive_day_increments() {
        let h = habit(0, vec![]);
        let target = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let prev = log_on(target - chrono::Duration::days(1), 4);
        assert_eq!(streak_for(&h, Some(&prev), target), 5);
    }

    #[test]
    fn gap_within_allowed_skip_days_still_increments() {
        let h = habit(2, vec![]);
        let target = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let prev = log_on(target - chrono::Duration::days(3), 4);
        assert_eq!(streak_for(&h, Some(&prev), target), 5);
    }

    #[test]
    fn gap_beyond_allowed_skip_days_resets() {
        let h = habit(1, vec![]);
        let target = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let prev = log_on(target - chrono::Duration::days(4), 4);
        assert_eq!(streak_for(&h, Some(&prev), target), 1);
    }

    #[test]
    fn exempt_weekdays_do_not_count_as_missed() {
        // Sat=6, Sun=7 exempt. Gap of 3 days spanning a weekend shouldn't break it
        // even with allowed_skip_days = 0.
        let h = habit(0, vec![6, 7]);
        // 2026-01-05 is a Monday; previous completion on the prior Tuesday (2025-12-30).
        let target = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let prev_date = NaiveDate::from_ymd_opt(2025, 12, 30).unwrap();
        let prev = log_on(prev_date, 2);
        // Missed days strictly between prev_date and target: 31st(Wed),1st(Thu),2nd(Fri),3rd(Sat),4th(Sun)
        // Sat/Sun exempt -> 3 non-exempt missed days > allowed_skip_days(0) -> resets.
        assert_eq!(streak_for(&h, Some(&prev), target), 1);
    }

    #[test]
    fn current_streak_reflects_stored_value() {
        let log = log_on(Utc::now().date_naive(), 7);
        assert_eq!(current_streak(Some(&log)), 7);
        assert_eq!(current_streak(None), 0);
    }
}
