use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::domain::error::{not_found_as, DomainError, OpError};
use crate::dto::{
    BatchCompleteError, BatchCompleteRequest, BatchCompleteResponse, CompleteHabitRequest,
    CompleteHabitResponse, HabitLogResponse, ListLogsQuery, RevertLogResponse,
};
use crate::error::AppResult;
use crate::AppState;

pub async fn complete_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
    Json(body): Json<CompleteHabitRequest>,
) -> AppResult<Json<CompleteHabitResponse>> {
    let user = state.users.find_by_id(auth_user.id).await?;
    let habit = state
        .habits
        .find_by_id(habit_id)
        .await
        .map_err(not_found_as(DomainError::HabitNotFound))?;
    if habit.user_id != user.id {
        return Err(OpError::Domain(DomainError::NotOwner).into());
    }

    let mut rng = rand::thread_rng();
    let result = state
        .completion_engine
        .process_completion_for_user(&user, &habit.name, body.target_date, &user.timezone, &mut rng)
        .await?;
    Ok(Json(result))
}

pub async fn batch_complete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<BatchCompleteRequest>,
) -> AppResult<Json<BatchCompleteResponse>> {
    let user = state.users.find_by_id(auth_user.id).await?;
    let mut results = Vec::new();
    let mut errors = Vec::new();

    for item in body.completions {
        let outcome = async {
            let habit = state
                .habits
                .find_by_id(item.habit_id)
                .await
                .map_err(not_found_as(DomainError::HabitNotFound))?;
            if habit.user_id != user.id {
                return Err(OpError::Domain(DomainError::NotOwner));
            }
            let mut rng = rand::thread_rng();
            state
                .completion_engine
                .process_completion_for_user(&user, &habit.name, item.target_date, &user.timezone, &mut rng)
                .await
        }
        .await;

        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                let (code, message) = match &e {
                    OpError::Domain(d) => (d.code().to_string(), d.to_string()),
                    OpError::Repo(r) => ("INTERNAL_SERVER_ERROR".to_string(), r.to_string()),
                };
                errors.push(BatchCompleteError { habit_id: item.habit_id, code, message });
            }
        }
    }

    Ok(Json(BatchCompleteResponse { results, errors }))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListLogsQuery>,
) -> AppResult<Json<Vec<HabitLogResponse>>> {
    if let Some(habit_id) = query.habit_id {
        let habit = state
            .habits
            .find_by_id(habit_id)
            .await
            .map_err(not_found_as(DomainError::HabitNotFound))?;
        if habit.user_id != auth_user.id {
            return Err(OpError::Domain(DomainError::NotOwner).into());
        }
    }

    let logs = state
        .logs
        .list(
            auth_user.id,
            query.habit_id,
            query.start_date,
            query.end_date,
            query.limit,
            query.offset,
        )
        .await?;
    Ok(Json(logs))
}

pub async fn revert_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<RevertLogResponse>> {
    let result = state.revert_engine.revert_by_log_id(auth_user.id, log_id).await?;
    Ok(Json(result))
}
