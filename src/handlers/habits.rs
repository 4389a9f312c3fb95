use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::domain::error::DomainError;
use crate::dto::{CreateHabitRequest, HabitResponse, ListHabitsQuery, UpdateHabitRequest};
use crate::error::{AppError, AppResult};
use crate::models::habit::Habit;
use crate::AppState;

pub async fn list_habits(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListHabitsQuery>,
) -> AppResult<Json<Vec<HabitResponse>>> {
    let habits = state
        .habits
        .list(auth_user.id, query.active, query.category.as_deref())
        .await?;
    Ok(Json(habits))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateHabitRequest>,
) -> AppResult<(axum::http::StatusCode, Json<HabitResponse>)> {
    body.validate().map_err(AppError::from)?;
    if !crate::dto::validate_exempt_weekdays(&body.exempt_weekdays) {
        return Err(AppError::Domain(DomainError::InvalidWeekdays));
    }

    let habit = Habit {
        id: Uuid::new_v4(),
        user_id: auth_user.id,
        name: body.name,
        weight: body.weight,
        category: body.category,
        allowed_skip_days: body.allowed_skip_days,
        exempt_weekdays: body.exempt_weekdays,
        active: true,
        created_at: chrono::Utc::now(),
    };

    let habit = state.habits.create(habit).await.map_err(|e| match e {
        crate::domain::error::RepoError::Conflict(_) => AppError::Domain(DomainError::HabitExists),
        other => AppError::from(other),
    })?;

    Ok((axum::http::StatusCode::CREATED, Json(habit)))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
    Json(body): Json<UpdateHabitRequest>,
) -> AppResult<Json<HabitResponse>> {
    body.validate().map_err(AppError::from)?;
    let mut habit = state
        .habits
        .find_by_id(habit_id)
        .await
        .map_err(crate::domain::error::not_found_as(DomainError::HabitNotFound))?;
    if habit.user_id != auth_user.id {
        return Err(AppError::Domain(DomainError::NotOwner));
    }

    if let Some(weekdays) = &body.exempt_weekdays {
        if !crate::dto::validate_exempt_weekdays(weekdays) {
            return Err(AppError::Domain(DomainError::InvalidWeekdays));
        }
        habit.exempt_weekdays = weekdays.clone();
    }
    if let Some(name) = body.name {
        habit.name = name;
    }
    if let Some(weight) = body.weight {
        habit.weight = weight;
    }
    if let Some(category) = body.category {
        habit.category = Some(category);
    }
    if let Some(allowed_skip_days) = body.allowed_skip_days {
        habit.allowed_skip_days = allowed_skip_days;
    }

    let habit = state.habits.update(habit).await.map_err(|e| match e {
        crate::domain::error::RepoError::Conflict(_) => AppError::Domain(DomainError::HabitExists),
        other => AppError::from(other),
    })?;
    Ok(Json(habit))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<crate::dto::MessageResponse>> {
    let habit = state
        .habits
        .find_by_id(habit_id)
        .await
        .map_err(crate::domain::error::not_found_as(DomainError::HabitNotFound))?;
    if habit.user_id != auth_user.id {
        return Err(AppError::Domain(DomainError::NotOwner));
    }

    state.habits.soft_delete(habit_id).await?;
    Ok(Json(crate::dto::MessageResponse::new("habit deleted")))
}
