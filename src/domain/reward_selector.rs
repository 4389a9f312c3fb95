//! Weighted random reward draw. The RNG is injected so tests are
//! deterministic; production wires in `rand::thread_rng`.

use rand::Rng;
use uuid::Uuid;

use crate::models::reward::Reward;

/// Sentinel returned when the active-reward pool for a user is empty, or
/// when the caller should treat the draw as "no reward". `reward_type` is
/// informational only — callers key off `is_none()`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnReward {
    pub reward: Option<Reward>,
}

impl DrawnReward {
    pub fn none() -> Self {
        Self { reward: None }
    }

    pub fn got_reward(&self) -> bool {
        self.reward.is_some()
    }
}

/// Rewards still eligible today, i.e. with room left under `max_daily_claims`.
/// `claims_today` maps reward id -> claims already recorded today.
pub fn eligible_today<'a>(
    active_rewards: &'a [Reward],
    claims_today: &std::collections::HashMap<Uuid, i32>,
) -> Vec<&'a Reward> {
    active_rewards
        .iter()
        .filter(|r| {
            if r.unlimited_daily_claims() {
                return true;
            }
            let used = claims_today.get(&r.id).copied().unwrap_or(0);
            used < r.max_daily_claims.unwrap_or(0)
        })
        .collect()
}

/// `habit_weight x (1 + streak_count * 0.1)`.
pub fn total_weight(habit_weight: i32, streak_count: i32) -> f64 {
    habit_weight as f64 * (1.0 + streak_count as f64 * 0.1)
}

/// Draws a reward from `pool` with probability proportional to
/// `reward.weight * total_weight`. Returns `DrawnReward::none()` if the pool
/// is empty.
pub fn select_reward(pool: &[&Reward], total_weight: f64, rng: &mut impl Rng) -> DrawnReward {
    if pool.is_empty() {
        return DrawnReward::none();
    }

    let adjusted: Vec<f64> = pool.iter().map(|r| r.weight * total_weight).collect();
    let sum: f64 = adjusted.iter().sum();
    if sum <= 0.0 {
        return DrawnReward::none();
    }

    let mut draw = rng.gen_range(0.0..sum);
    for (reward, weight) in pool.iter().zip(adjusted.iter()) {
        if draw < *weight {
            return DrawnReward {
                reward: Some((*reward).clone()),
            };
        }
        draw -= weight;
    }
    // Floating-point rounding at the boundary: fall back to the last candidate.
    DrawnReward {
        reward: pool.last().map(|r| (*r).clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use uuid::Uuid;

    fn reward(weight: f64) -> Reward {
        Reward {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "prize".into(),
            weight,
            pieces_required: 1,
            piece_value: None,
            max_daily_claims: None,
            active: true,
        }
    }

    #[test]
    fn empty_pool_returns_none() {
        let pool: Vec<&Reward> = vec![];
        let mut rng = StepRng::new(0, 1);
        let drawn = select_reward(&pool, total_weight(10, 0), &mut rng);
        assert!(!drawn.got_reward());
    }

    #[test]
    fn single_candidate_always_wins() {
        let r = reward(5.0);
        let pool = vec![&r];
        let mut rng = StepRng::new(0, 1);
        let drawn = select_reward(&pool, total_weight(10, 3), &mut rng);
        assert_eq!(drawn.reward.unwrap().id, r.id);
    }

    #[test]
    fn daily_claim_quota_filters_out_exhausted_rewards() {
        let mut r = reward(5.0);
        r.max_daily_claims = Some(1);
        let mut claims = std::collections::HashMap::new();
        claims.insert(r.id, 1);
        let pool = vec![r.clone()];
        let eligible = eligible_today(&pool, &claims);
        assert!(eligible.is_empty());
    }

    #[test]
    fn unlimited_quota_is_never_filtered() {
        let r = reward(5.0);
        let claims = std::collections::HashMap::new();
        let pool = vec![r.clone()];
        assert_eq!(eligible_today(&pool, &claims).len(), 1);
    }
}
