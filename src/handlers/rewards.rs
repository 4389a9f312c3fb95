use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::domain::error::{not_found_as, DomainError};
use crate::domain::progress as progress_ops;
use crate::dto::{
    ClaimRewardResponse, CreateRewardRequest, ListRewardsQuery, RewardProgressResponse,
    RewardWithProgressResponse,
};
use crate::error::{AppError, AppResult};
use crate::models::audit_log::AuditEventKind;
use crate::models::reward::Reward;
use crate::models::reward_progress::{ProgressStatus, RewardProgress};
use crate::AppState;

pub async fn list_rewards(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListRewardsQuery>,
) -> AppResult<Json<Vec<RewardWithProgressResponse>>> {
    let rewards = if query.status.as_deref() == Some("active") {
        state.rewards.list_active(auth_user.id).await?
    } else {
        state.rewards.list(auth_user.id).await?
    };

    let status_filter = query
        .status
        .as_deref()
        .and_then(|s| match s.to_uppercase().as_str() {
            "PENDING" => Some(ProgressStatus::Pending),
            "ACHIEVED" => Some(ProgressStatus::Achieved),
            "CLAIMED" => Some(ProgressStatus::Claimed),
            _ => None,
        });

    let mut out = Vec::with_capacity(rewards.len());
    for reward in rewards {
        let progress = state.progress.find(auth_user.id, reward.id).await?;
        if let Some(wanted) = status_filter {
            let actual = progress.as_ref().map(|p| p.status(reward.pieces_required));
            if actual != Some(wanted) {
                continue;
            }
        }
        out.push(RewardWithProgressResponse {
            progress: progress.as_ref().map(|p| RewardProgressResponse::new(p, reward.pieces_required)),
            reward,
        });
    }
    Ok(Json(out))
}

pub async fn create_reward(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateRewardRequest>,
) -> AppResult<(axum::http::StatusCode, Json<Reward>)> {
    body.validate().map_err(AppError::from)?;
    let reward = Reward {
        id: Uuid::new_v4(),
        user_id: auth_user.id,
        name: body.name,
        weight: body.weight,
        pieces_required: body.pieces_required,
        piece_value: body.piece_value,
        max_daily_claims: body.max_daily_claims,
        active: true,
    };

    let reward = state.rewards.create(reward).await.map_err(|e| match e {
        crate::domain::error::RepoError::Conflict(_) => AppError::Domain(DomainError::RewardExists),
        other => AppError::from(other),
    })?;

    Ok((axum::http::StatusCode::CREATED, Json(reward)))
}

pub async fn claim_reward(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(reward_id): Path<Uuid>,
) -> AppResult<Json<ClaimRewardResponse>> {
    let reward = state
        .rewards
        .find_by_id(reward_id)
        .await
        .map_err(not_found_as(DomainError::RewardNotFound))?;
    if reward.user_id != auth_user.id {
        return Err(AppError::Domain(DomainError::NotOwner));
    }

    let progress = state
        .progress
        .find(auth_user.id, reward_id)
        .await?
        .unwrap_or(RewardProgress {
            id: Uuid::new_v4(),
            user_id: auth_user.id,
            reward_id,
            pieces_earned: 0,
            claimed: false,
        });

    let claimed = progress_ops::mark_claimed(progress, reward.pieces_required)?;
    state.progress.upsert(claimed).await?;

    state
        .audit
        .log(
            auth_user.id,
            AuditEventKind::RewardClaimed,
            None,
            Some(reward.id),
            None,
            serde_json::json!({ "reward_name": reward.name }),
            None,
        )
        .await?;

    Ok(Json(ClaimRewardResponse {
        message: "reward claimed".into(),
        reward,
    }))
}
