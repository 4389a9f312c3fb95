//! Thin wrapper around `AuditStore` giving the four named operations a
//! stable home. The store itself does the actual writes; this module
//! exists so callers depend on a narrow surface rather than the full
//! repository trait.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::error::RepoResult;
use crate::models::audit_log::{AuditEventKind, AuditLog};
use crate::repositories::AuditStore;

pub struct AuditService {
    pub store: Arc<dyn AuditStore>,
}

impl AuditService {
    #[allow(clippy::too_many_arguments)]
    pub async fn log(
        &self,
        user_id: Uuid,
        kind: AuditEventKind,
        habit_id: Option<Uuid>,
        reward_id: Option<Uuid>,
        log_id: Option<Uuid>,
        payload: serde_json::Value,
        error_message: Option<String>,
    ) -> RepoResult<AuditLog> {
        self.store
            .log(user_id, kind, habit_id, reward_id, log_id, payload, error_message)
            .await
    }

    pub async fn timeline(&self, user_id: Uuid, hours_back: i64) -> RepoResult<Vec<AuditLog>> {
        self.store.timeline(user_id, hours_back).await
    }

    pub async fn trace_reward(&self, user_id: Uuid, reward_id: Uuid) -> RepoResult<Vec<AuditLog>> {
        self.store.trace_reward(user_id, reward_id).await
    }

    pub async fn cleanup(&self, retention_days: i64) -> RepoResult<u64> {
        self.store.cleanup(retention_days).await
    }
}
