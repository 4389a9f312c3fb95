use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{UpdateProfileRequest, UserResponse, ALLOWED_LANGUAGES};
use crate::error::{AppError, AppResult};
use crate::AppState;

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserResponse>> {
    let user = state.users.find_by_id(auth_user.id).await?;
    Ok(Json(user.into()))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    body.validate().map_err(AppError::from)?;
    let language = match body.language {
        Some(lang) => {
            let normalized = crate::dto::normalize_language(&lang);
            if !ALLOWED_LANGUAGES.contains(&normalized.as_str()) {
                return Err(AppError::Validation(format!("unsupported language: {lang}")));
            }
            Some(normalized)
        }
        None => None,
    };

    let user = state
        .users
        .update_profile(auth_user.id, body.name.as_deref(), language.as_deref())
        .await?;
    Ok(Json(user.into()))
}
