use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::domain::error::{not_found_as, DomainError};
use crate::dto::{StreakDetailResponse, StreakListResponse, StreakSummary};
use crate::error::AppResult;
use crate::AppState;

pub async fn list_streaks(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<StreakListResponse>> {
    let habits = state.habits.list(auth_user.id, Some(true), None).await?;
    let mut streaks = Vec::with_capacity(habits.len());
    for habit in habits {
        let latest = state.logs.find_latest(auth_user.id, habit.id).await?;
        streaks.push(StreakSummary {
            habit_id: habit.id,
            habit_name: habit.name,
            current_streak: latest.as_ref().map(|l| l.streak_count).unwrap_or(0),
            last_completed: latest.map(|l| l.last_completed_date),
        });
    }
    Ok(Json(StreakListResponse { streaks }))
}

pub async fn streak_detail(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<StreakDetailResponse>> {
    let habit = state
        .habits
        .find_by_id(habit_id)
        .await
        .map_err(not_found_as(DomainError::HabitNotFound))?;
    if habit.user_id != auth_user.id {
        return Err(crate::error::AppError::Domain(DomainError::NotOwner));
    }

    let today = crate::domain::clock::user_today("UTC");
    let earliest = today - chrono::Duration::days(3650);
    let history = state.logs.range(auth_user.id, habit_id, earliest, today).await?;

    let current_streak = history
        .iter()
        .max_by_key(|l| l.last_completed_date)
        .map(|l| l.streak_count)
        .unwrap_or(0);
    let longest_streak = history.iter().map(|l| l.streak_count).max().unwrap_or(0);
    let last_completed = history.iter().map(|l| l.last_completed_date).max();

    Ok(Json(StreakDetailResponse { current_streak, longest_streak, last_completed }))
}
