//! Auth-code issuance and verification: rate-limited one-time codes with
//! brute-force lockout and anti-enumeration semantics.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::domain::error::RepoResult;
use crate::models::auth_code::AuthCode;
use crate::models::user::User;
use crate::repositories::{AuthCodeStore, UserStore};

const CODE_TTL_MINUTES: i64 = 5;
const ISSUE_RATE_LIMIT_PER_HOUR: i64 = 3;
const LOCKOUT_THRESHOLD: i32 = 5;
const LOCKOUT_MINUTES: i64 = 15;

pub struct AuthCodeService {
    pub users: Arc<dyn UserStore>,
    pub codes: Arc<dyn AuthCodeStore>,
}

pub enum IssueOutcome {
    Issued { code: String, expires_at: DateTime<Utc> },
    RateLimited,
    /// User absent or inactive. Treated identically to `Issued` by the REST
    /// surface (always 200) so a prober cannot distinguish valid from
    /// invalid telegram ids.
    SilentOk,
}

pub enum VerifyOutcome {
    Ok(User),
    Invalid,
}

impl AuthCodeService {
    pub async fn issue_code(
        &self,
        telegram_id: &str,
        device_info: Option<&str>,
        rng: &mut impl Rng,
    ) -> RepoResult<IssueOutcome> {
        let user = match self.users.find_by_telegram_id(telegram_id).await {
            Ok(u) if u.active => u,
            _ => return Ok(IssueOutcome::SilentOk),
        };

        let since = Utc::now() - Duration::hours(1);
        let issued_recently = self.codes.count_issued_since(user.id, since).await?;
        if issued_recently >= ISSUE_RATE_LIMIT_PER_HOUR {
            return Ok(IssueOutcome::RateLimited);
        }

        self.codes.invalidate_unused(user.id).await?;

        let now = Utc::now();
        let expires_at = now + Duration::minutes(CODE_TTL_MINUTES);
        let code = format!("{:06}", rng.gen_range(0..1_000_000u32));
        self.codes
            .insert(AuthCode {
                id: Uuid::new_v4(),
                user_id: user.id,
                code: code.clone(),
                created_at: now,
                expires_at,
                used: false,
                failed_attempts: 0,
                locked_until: None,
                device_info: device_info.map(|s| s.to_string()),
            })
            .await?;

        Ok(IssueOutcome::Issued { code, expires_at })
    }

    pub async fn verify_code(&self, telegram_id: &str, code: &str) -> RepoResult<VerifyOutcome> {
        let user = match self.users.find_by_telegram_id(telegram_id).await {
            Ok(u) if u.active => u,
            _ => return Ok(VerifyOutcome::Invalid),
        };

        let now = Utc::now();
        if self.codes.try_consume(user.id, code, now).await?.is_some() {
            return Ok(VerifyOutcome::Ok(user));
        }

        if let Some(active) = self.codes.find_latest_active(user.id, now).await? {
            let failed = active.failed_attempts + 1;
            let lock_until = if failed >= LOCKOUT_THRESHOLD {
                Some(now + Duration::minutes(LOCKOUT_MINUTES))
            } else {
                None
            };
            self.codes
                .record_failed_attempt(active.id, failed, lock_until)
                .await?;
        }

        Ok(VerifyOutcome::Invalid)
    }

    pub async fn cleanup_expired(&self) -> RepoResult<u64> {
        self.codes.cleanup_expired(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::FakeStore;
    use rand::rngs::mock::StepRng;

    fn service(store: &FakeStore) -> AuthCodeService {
        AuthCodeService { users: Arc::new(store.clone()), codes: Arc::new(store.clone()) }
    }

    fn seeded_user(store: &FakeStore, telegram_id: &str, active: bool) -> User {
        let u = User {
            id: Uuid::new_v4(),
            telegram_id: telegram_id.into(),
            name: "tester".into(),
            language: "en".into(),
            timezone: "UTC".into(),
            active,
            created_at: Utc::now() - Duration::days(30),
        };
        store.put_user(u.clone());
        u
    }

    #[tokio::test]
    async fn issue_then_verify_succeeds_once() {
        let store = FakeStore::new();
        let u = seeded_user(&store, "tg-1", true);
        let svc = service(&store);
        let mut rng = StepRng::new(123456, 0);

        let outcome = svc.issue_code(&u.telegram_id, None, &mut rng).await.unwrap();
        let code = match outcome {
            IssueOutcome::Issued { code, .. } => code,
            _ => panic!("expected Issued"),
        };

        match svc.verify_code(&u.telegram_id, &code).await.unwrap() {
            VerifyOutcome::Ok(verified) => assert_eq!(verified.id, u.id),
            VerifyOutcome::Invalid => panic!("expected Ok"),
        }

        // the code is single-use
        match svc.verify_code(&u.telegram_id, &code).await.unwrap() {
            VerifyOutcome::Invalid => {}
            VerifyOutcome::Ok(_) => panic!("code should not be reusable"),
        }
    }

    #[tokio::test]
    async fn issuing_is_rate_limited_per_hour() {
        let store = FakeStore::new();
        let u = seeded_user(&store, "tg-2", true);
        let svc = service(&store);
        let mut rng = StepRng::new(1, 0);

        for _ in 0..ISSUE_RATE_LIMIT_PER_HOUR {
            let outcome = svc.issue_code(&u.telegram_id, None, &mut rng).await.unwrap();
            assert!(matches!(outcome, IssueOutcome::Issued { .. }));
        }

        let outcome = svc.issue_code(&u.telegram_id, None, &mut rng).await.unwrap();
        assert!(matches!(outcome, IssueOutcome::RateLimited));
    }

    #[tokio::test]
    async fn issuing_for_unknown_user_is_silent_ok() {
        let store = FakeStore::new();
        let svc = service(&store);
        let mut rng = StepRng::new(1, 0);

        let outcome = svc.issue_code("ghost", None, &mut rng).await.unwrap();
        assert!(matches!(outcome, IssueOutcome::SilentOk));
    }

    #[tokio::test]
    async fn issuing_for_inactive_user_is_silent_ok() {
        let store = FakeStore::new();
        let u = seeded_user(&store, "tg-3", false);
        let svc = service(&store);
        let mut rng = StepRng::new(1, 0);

        let outcome = svc.issue_code(&u.telegram_id, None, &mut rng).await.unwrap();
        assert!(matches!(outcome, IssueOutcome::SilentOk));
    }

    #[tokio::test]
    async fn five_failed_attempts_lock_the_code_for_fifteen_minutes() {
        let store = FakeStore::new();
        let u = seeded_user(&store, "tg-4", true);
        let svc = service(&store);
        let now = Utc::now();
        store.put_auth_code(AuthCode {
            id: Uuid::new_v4(),
            user_id: u.id,
            code: "000000".into(),
            created_at: now,
            expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
            used: false,
            failed_attempts: 0,
            locked_until: None,
            device_info: None,
        });

        for _ in 0..(LOCKOUT_THRESHOLD - 1) {
            let outcome = svc.verify_code(&u.telegram_id, "999999").await.unwrap();
            assert!(matches!(outcome, VerifyOutcome::Invalid));
        }

        // the code is still valid right up to the lockout threshold
        let still_active = {
            let db = store.0.lock().unwrap();
            db.auth_codes.iter().find(|c| c.user_id == u.id).unwrap().locked_until
        };
        assert!(still_active.is_none());

        // the fifth failed attempt trips the lock
        let outcome = svc.verify_code(&u.telegram_id, "999999").await.unwrap();
        assert!(matches!(outcome, VerifyOutcome::Invalid));

        let locked_until = {
            let db = store.0.lock().unwrap();
            db.auth_codes.iter().find(|c| c.user_id == u.id).unwrap().locked_until
        };
        let locked_until = locked_until.expect("code should now be locked");
        assert!(locked_until > now + Duration::minutes(LOCKOUT_MINUTES - 1));

        // the correct code is rejected while locked, even though it hasn't expired
        let outcome = svc.verify_code(&u.telegram_id, "000000").await.unwrap();
        assert!(matches!(outcome, VerifyOutcome::Invalid));
    }

    #[tokio::test]
    async fn verifying_for_unknown_user_is_invalid_not_an_error() {
        let store = FakeStore::new();
        let svc = service(&store);
        let outcome = svc.verify_code("ghost", "123456").await.unwrap();
        assert!(matches!(outcome, VerifyOutcome::Invalid));
    }
}
