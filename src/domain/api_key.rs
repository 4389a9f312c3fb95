//! Long-lived bearer API keys. Raw key format: `hrk_` + 32 random
//! bytes, URL-safe base64. Only the SHA-256 hash is ever persisted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::error::{DomainError, OpError};
use crate::models::api_key::ApiKey;
use crate::repositories::{ApiKeyStore, UserStore};

const KEY_PREFIX: &str = "hrk_";

pub struct ApiKeyService {
    pub users: Arc<dyn UserStore>,
    pub keys: Arc<dyn ApiKeyStore>,
}

impl ApiKeyService {
    pub async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        expires_at: Option<DateTime<Utc>>,
        rng: &mut impl RngCore,
    ) -> Result<(ApiKey, String), OpError> {
        if self.keys.find_by_name(user_id, name).await?.is_some() {
            return Err(DomainError::ApiKeyNameExists.into());
        }

        let mut raw_bytes = [0u8; 32];
        rng.fill_bytes(&mut raw_bytes);
        let raw_key = format!(
            "{KEY_PREFIX}{}",
            base64_url_encode(&raw_bytes)
        );
        let key_hash = hash_key(&raw_key);

        let record = ApiKey {
            id: Uuid::new_v4(),
            user_id,
            key_hash,
            name: name.to_string(),
            created_at: Utc::now(),
            last_used_at: None,
            expires_at,
            active: true,
        };
        let record = self.keys.create(record).await?;
        Ok((record, raw_key))
    }

    pub async fn verify(&self, raw_key: &str) -> Result<crate::models::user::User, OpError> {
        if !raw_key.starts_with(KEY_PREFIX) {
            return Err(DomainError::InvalidApiKey.into());
        }
        let hash = hash_key(raw_key);
        let Some(record) = self.keys.find_by_hash(&hash).await? else {
            return Err(DomainError::InvalidApiKey.into());
        };
        let now = Utc::now();
        if !record.usable(now) {
            return Err(DomainError::InvalidApiKey.into());
        }
        let user = self.users.find_by_id(record.user_id).await?;
        if !user.active {
            return Err(DomainError::InvalidApiKey.into());
        }
        self.keys.touch_last_used(record.id, now).await?;
        Ok(user)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<ApiKey>, OpError> {
        Ok(self.keys.list(user_id).await?)
    }

    pub async fn revoke(&self, key_id: Uuid, user_id: Uuid) -> Result<(), OpError> {
        self.keys.revoke(key_id, user_id).await?;
        Ok(())
    }
}

fn hash_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());
    hex::encode(hasher.finalize())
}

fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::FakeStore;
    use chrono::Duration;
    use rand::rngs::mock::StepRng;

    fn service(store: &FakeStore) -> ApiKeyService {
        ApiKeyService { users: Arc::new(store.clone()), keys: Arc::new(store.clone()) }
    }

    fn seeded_user(store: &FakeStore) -> crate::models::user::User {
        let u = crate::models::user::User {
            id: Uuid::new_v4(),
            telegram_id: "tg-key".into(),
            name: "tester".into(),
            language: "en".into(),
            timezone: "UTC".into(),
            active: true,
            created_at: Utc::now() - Duration::days(30),
        };
        store.put_user(u.clone());
        u
    }

    #[tokio::test]
    async fn create_returns_a_key_prefixed_raw_value_and_only_stores_its_hash() {
        let store = FakeStore::new();
        let u = seeded_user(&store);
        let svc = service(&store);
        let mut rng = StepRng::new(7, 1);

        let (record, raw_key) = svc.create(u.id, "ci-bot", None, &mut rng).await.unwrap();

        assert!(raw_key.starts_with(KEY_PREFIX));
        assert_ne!(record.key_hash, raw_key);
        assert_eq!(record.key_hash, hash_key(&raw_key));
    }

    #[tokio::test]
    async fn duplicate_name_for_same_user_is_rejected() {
        let store = FakeStore::new();
        let u = seeded_user(&store);
        let svc = service(&store);
        let mut rng = StepRng::new(7, 1);

        svc.create(u.id, "ci-bot", None, &mut rng).await.unwrap();
        let err = svc.create(u.id, "ci-bot", None, &mut rng).await.unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::ApiKeyNameExists)));
    }

    #[tokio::test]
    async fn verify_succeeds_for_a_freshly_created_key_and_touches_last_used() {
        let store = FakeStore::new();
        let u = seeded_user(&store);
        let svc = service(&store);
        let mut rng = StepRng::new(7, 1);

        let (record, raw_key) = svc.create(u.id, "ci-bot", None, &mut rng).await.unwrap();
        let verified = svc.verify(&raw_key).await.unwrap();
        assert_eq!(verified.id, u.id);

        let db = store.0.lock().unwrap();
        let stored = db.api_keys.iter().find(|k| k.id == record.id).unwrap();
        assert!(stored.last_used_at.is_some());
    }

    #[tokio::test]
    async fn verify_rejects_a_garbled_key() {
        let store = FakeStore::new();
        let svc = service(&store);
        let err = svc.verify("not-a-real-key").await.unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn verify_rejects_an_expired_key() {
        let store = FakeStore::new();
        let u = seeded_user(&store);
        let svc = service(&store);
        let mut rng = StepRng::new(7, 1);

        let expired_at = Utc::now() - Duration::minutes(1);
        let (_, raw_key) = svc.create(u.id, "ci-bot", Some(expired_at), &mut rng).await.unwrap();

        let err = svc.verify(&raw_key).await.unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn verify_rejects_a_revoked_key() {
        let store = FakeStore::new();
        let u = seeded_user(&store);
        let svc = service(&store);
        let mut rng = StepRng::new(7, 1);

        let (record, raw_key) = svc.create(u.id, "ci-bot", None, &mut rng).await.unwrap();
        svc.revoke(record.id, u.id).await.unwrap();

        let err = svc.verify(&raw_key).await.unwrap_err();
        assert!(matches!(err, OpError::Domain(DomainError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn list_only_returns_keys_for_the_requesting_user() {
        let store = FakeStore::new();
        let u = seeded_user(&store);
        let other = Uuid::new_v4();
        let svc = service(&store);
        let mut rng = StepRng::new(7, 1);

        svc.create(u.id, "ci-bot", None, &mut rng).await.unwrap();
        svc.create(other, "someone-elses-key", None, &mut rng).await.unwrap();

        let keys = svc.list(u.id).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].user_id, u.id);
    }
}
