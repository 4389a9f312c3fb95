use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{ApiKeyResponse, CreateApiKeyRequest, CreateApiKeyResponse, MessageResponse};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// There is no other way for a client to mint one of the two credential
/// types the auth layer accepts.
pub async fn create_key(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateApiKeyRequest>,
) -> AppResult<(axum::http::StatusCode, Json<CreateApiKeyResponse>)> {
    body.validate().map_err(AppError::from)?;
    let mut rng = rand::rngs::OsRng;
    let (record, raw_key) = state
        .api_keys
        .create(auth_user.id, &body.name, body.expires_at, &mut rng)
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CreateApiKeyResponse { key: raw_key, id: record.id, name: record.name }),
    ))
}

pub async fn list_keys(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<ApiKeyResponse>>> {
    let keys = state.api_keys.list(auth_user.id).await?;
    Ok(Json(keys))
}

pub async fn revoke_key(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(key_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.api_keys.revoke(key_id, auth_user.id).await?;
    Ok(Json(MessageResponse::new("api key revoked")))
}
