use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::jwt::{verify_token, TokenType};
use crate::domain::error::DomainError;
use crate::error::AppError;
use crate::AppState;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub telegram_id: Option<String>,
}

/// JWT takes priority when both an `Authorization: Bearer` header and an
/// `X-API-Key` header are present.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(token) = bearer {
        let data = verify_token(token, TokenType::Access, &state.config)?;
        let auth_user = AuthUser {
            id: data.claims.sub,
            telegram_id: data.claims.telegram_id,
        };
        req.extensions_mut().insert(auth_user);
        return Ok(next.run(req).await);
    }

    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if let Some(raw_key) = api_key {
        let user = state.api_keys.verify(&raw_key).await?;
        let auth_user = AuthUser {
            id: user.id,
            telegram_id: Some(user.telegram_id),
        };
        req.extensions_mut().insert(auth_user);
        return Ok(next.run(req).await);
    }

    Err(AppError::Domain(DomainError::AuthRequired))
}
