//! Reward progress bookkeeping. Pure transformations over an
//! already-loaded `RewardProgress` row; the upsert/persist calls live in the
//! repository layer, which applies these the same way under a lock.

use crate::domain::error::DomainError;
use crate::models::reward_progress::RewardProgress;

pub fn increment(mut progress: RewardProgress) -> RewardProgress {
    progress.pieces_earned += 1;
    progress
}

pub fn decrement(mut progress: RewardProgress) -> RewardProgress {
    progress.pieces_earned = (progress.pieces_earned - 1).max(0);
    progress.claimed = false;
    progress
}

pub fn mark_claimed(
    mut progress: RewardProgress,
    pieces_required: i32,
) -> Result<RewardProgress, DomainError> {
    if progress.claimed {
        return Err(DomainError::AlreadyClaimed);
    }
    if progress.pieces_earned < pieces_required {
        return Err(DomainError::NotAchieved);
    }
    progress.claimed = true;
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn progress(pieces_earned: i32, claimed: bool) -> RewardProgress {
        RewardProgress {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            reward_id: Uuid::new_v4(),
            pieces_earned,
            claimed,
        }
    }

    #[test]
    fn decrement_never_goes_negative() {
        let p = progress(0, false);
        assert_eq!(decrement(p).pieces_earned, 0);
    }

    #[test]
    fn decrement_clears_claimed() {
        let p = progress(3, true);
        let p = decrement(p);
        assert!(!p.claimed);
    }

    #[test]
    fn claim_requires_achieved_status() {
        let p = progress(2, false);
        assert_eq!(mark_claimed(p, 3).unwrap_err(), DomainError::NotAchieved);
    }

    #[test]
    fn claim_rejects_already_claimed() {
        let p = progress(5, true);
        assert_eq!(
            mark_claimed(p, 3).unwrap_err(),
            DomainError::AlreadyClaimed
        );
    }

    #[test]
    fn claim_succeeds_when_achieved() {
        let p = progress(3, false);
        assert!(mark_claimed(p, 3).unwrap().claimed);
    }
}
