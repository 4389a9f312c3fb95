use axum::{extract::State, http::StatusCode, Json};

use crate::auth::jwt::{create_access_token, create_token_pair, verify_token, TokenType};
use crate::domain::auth_code::{IssueOutcome, VerifyOutcome};
use crate::domain::error::DomainError;
use crate::dto::{
    AccessTokenResponse, MessageResponse, RefreshRequest, RequestCodeRequest, TokenPairResponse,
    VerifyCodeRequest,
};
use crate::error::{AppError, AppResult};
use crate::AppState;
use validator::Validate;

/// POST /v1/auth/request-code. Always 200 — absent/inactive users get the
/// same response a valid one would, so a prober can't distinguish the two.
pub async fn request_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeRequest>,
) -> AppResult<Json<MessageResponse>> {
    body.validate().map_err(AppError::from)?;
    let mut rng = rand::thread_rng();
    let outcome = state
        .auth_codes
        .issue_code(&body.telegram_id, body.device_info.as_deref(), &mut rng)
        .await
        .map_err(AppError::from)?;

    match outcome {
        IssueOutcome::RateLimited => Err(AppError::Domain(DomainError::RateLimited)),
        IssueOutcome::Issued { .. } | IssueOutcome::SilentOk => {
            Ok(Json(MessageResponse::new("if the account exists, a code has been sent")))
        }
    }
}

pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> AppResult<Json<TokenPairResponse>> {
    body.validate().map_err(AppError::from)?;
    let outcome = state
        .auth_codes
        .verify_code(&body.telegram_id, &body.code)
        .await
        .map_err(AppError::from)?;

    let VerifyOutcome::Ok(user) = outcome else {
        return Err(AppError::Domain(DomainError::InvalidCode));
    };

    let tokens = create_token_pair(user.id, &user.telegram_id, &state.config)?;
    Ok(Json(TokenPairResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "bearer",
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, crate::error::StatusAppError> {
    let data = verify_token(&body.refresh_token, TokenType::Refresh, &state.config)
        .map_err(|e| AppError::Domain(e).with_status(StatusCode::UNAUTHORIZED))?;

    let user = state
        .users
        .find_by_id(data.claims.sub)
        .await
        .map_err(|_| AppError::Domain(DomainError::UserNotFound).with_status(StatusCode::UNAUTHORIZED))?;
    if !user.active {
        return Err(AppError::Domain(DomainError::UserInactive).with_status(StatusCode::UNAUTHORIZED));
    }

    let access_token = create_access_token(user.id, &user.telegram_id, &state.config)
        .map_err(|e| AppError::Domain(e).with_status(StatusCode::UNAUTHORIZED))?;
    Ok(Json(AccessTokenResponse { access_token, token_type: "bearer" }))
}

/// Tokens are stateless — there is no server-side store to clear. Kept as a
/// 200 no-op so existing clients don't need special-case handling.
pub async fn logout() -> AppResult<Json<MessageResponse>> {
    Ok(Json(MessageResponse::new("logged out")))
}

pub async fn deprecated_login() -> AppError {
    AppError::Domain(DomainError::DeprecatedLogin)
}
