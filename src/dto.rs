//! # Request/Response DTOs
//!
//! All API contract types in one module. Each struct maps 1:1 to the JSON
//! shapes in the REST surface.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Validation is expressed via `validator` derive macros where the shape
//!   allows it; cross-field rules (e.g. `exempt_weekdays` values) are
//!   checked in the handler against the domain error taxonomy instead.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::completion::CompletionResult;
use crate::domain::revert::RevertResult;
use crate::models::api_key::ApiKey;
use crate::models::habit::Habit;
use crate::models::habit_log::HabitLog;
use crate::models::reward::Reward;
use crate::models::reward_progress::{ProgressStatus, RewardProgress};
use crate::models::user::UserProfile;

// ============================================================================
// Common
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

// ============================================================================
// Auth
// ============================================================================

/// POST /v1/auth/request-code
#[derive(Debug, Deserialize, Validate)]
pub struct RequestCodeRequest {
    #[validate(length(min = 1, max = 64))]
    pub telegram_id: String,
    pub device_info: Option<String>,
}

/// POST /v1/auth/verify-code
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(length(min = 1, max = 64))]
    pub telegram_id: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

/// POST /v1/auth/refresh
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// POST /v1/auth/logout
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

// ============================================================================
// Users
// ============================================================================

/// PATCH /v1/users/me
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub language: Option<String>,
}

pub fn normalize_language(language: &str) -> String {
    language.chars().take(2).collect::<String>().to_lowercase()
}

pub const ALLOWED_LANGUAGES: [&str; 3] = ["en", "ru", "kk"];

pub type UserResponse = UserProfile;

// ============================================================================
// Habits
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListHabitsQuery {
    pub active: Option<bool>,
    pub category: Option<String>,
}

/// POST /v1/habits
#[derive(Debug, Deserialize, Validate)]
pub struct CreateHabitRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1, max = 100))]
    pub weight: i32,
    pub category: Option<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub allowed_skip_days: i32,
    #[serde(default)]
    pub exempt_weekdays: Vec<i32>,
}

/// PATCH /v1/habits/{id}
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateHabitRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub weight: Option<i32>,
    pub category: Option<String>,
    #[validate(range(min = 0))]
    pub allowed_skip_days: Option<i32>,
    pub exempt_weekdays: Option<Vec<i32>>,
}

pub type HabitResponse = Habit;

pub fn validate_exempt_weekdays(days: &[i32]) -> bool {
    days.iter().all(|d| (1..=7).contains(d))
}

// ============================================================================
// Completions
// ============================================================================

/// POST /v1/habits/{id}/complete
#[derive(Debug, Deserialize, Default)]
pub struct CompleteHabitRequest {
    pub target_date: Option<NaiveDate>,
}

/// POST /v1/habits/batch-complete
#[derive(Debug, Deserialize)]
pub struct BatchCompleteRequest {
    pub completions: Vec<BatchCompleteItem>,
}

#[derive(Debug, Deserialize)]
pub struct BatchCompleteItem {
    pub habit_id: Uuid,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct BatchCompleteResponse {
    pub results: Vec<CompletionResult>,
    pub errors: Vec<BatchCompleteError>,
}

#[derive(Debug, Serialize)]
pub struct BatchCompleteError {
    pub habit_id: Uuid,
    pub code: String,
    pub message: String,
}

pub type CompleteHabitResponse = CompletionResult;
pub type RevertLogResponse = RevertResult;

#[derive(Debug, Deserialize)]
pub struct ListLogsQuery {
    pub habit_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub type HabitLogResponse = HabitLog;

// ============================================================================
// Rewards
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListRewardsQuery {
    #[serde(rename = "type")]
    pub reward_type: Option<String>,
    pub status: Option<String>,
}

/// POST /v1/rewards
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRewardRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom = "validate_positive_weight")]
    pub weight: f64,
    #[validate(range(min = 1))]
    pub pieces_required: i32,
    pub piece_value: Option<f64>,
    pub max_daily_claims: Option<i32>,
}

fn validate_positive_weight(weight: &f64) -> Result<(), ValidationError> {
    if *weight > 0.0 && *weight <= 100.0 {
        Ok(())
    } else {
        Err(ValidationError::new("weight_out_of_range"))
    }
}

#[derive(Debug, Serialize)]
pub struct RewardWithProgressResponse {
    pub reward: Reward,
    pub progress: Option<RewardProgressResponse>,
}

#[derive(Debug, Serialize)]
pub struct RewardProgressResponse {
    pub pieces_earned: i32,
    pub claimed: bool,
    pub status: ProgressStatus,
}

impl RewardProgressResponse {
    pub fn new(progress: &RewardProgress, pieces_required: i32) -> Self {
        Self {
            pieces_earned: progress.pieces_earned,
            claimed: progress.claimed,
            status: progress.status(pieces_required),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimRewardResponse {
    pub message: String,
    pub reward: Reward,
}

// ============================================================================
// Streaks
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StreakSummary {
    pub habit_id: Uuid,
    pub habit_name: String,
    pub current_streak: i32,
    pub last_completed: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct StreakListResponse {
    pub streaks: Vec<StreakSummary>,
}

#[derive(Debug, Serialize)]
pub struct StreakDetailResponse {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_completed: Option<NaiveDate>,
}

// ============================================================================
// API keys
// ============================================================================

/// POST /v1/api-keys
#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    pub key: String,
    pub id: Uuid,
    pub name: String,
}

pub type ApiKeyResponse = ApiKey;

// ============================================================================
// System
// ============================================================================

/// GET /health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /readyz
#[derive(Debug, Serialize)]
pub struct ReadyzResponse {
    pub status: &'static str,
    pub checks: ReadyzChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadyzChecks {
    pub database: bool,
}
