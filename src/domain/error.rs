//! Domain-level error taxonomy.
//!
//! Every kind named in the error handling design is represented here. These
//! carry no HTTP knowledge — `crate::error::AppError` is the transport-facing
//! wrapper that assigns a status code and machine-readable `code` string.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    // Input
    #[error("user not found")]
    UserNotFound,
    #[error("habit not found")]
    HabitNotFound,
    #[error("reward not found")]
    RewardNotFound,
    #[error("habit log not found")]
    LogNotFound,

    // Authorisation
    #[error("not the owner of this resource")]
    NotOwner,
    #[error("user is inactive")]
    UserInactive,
    #[error("authentication token missing")]
    MissingToken,
    #[error("authentication token invalid")]
    InvalidToken,
    #[error("authentication token expired")]
    TokenExpired,
    #[error("wrong token type for this operation")]
    InvalidTokenType,
    #[error("api key invalid")]
    InvalidApiKey,
    #[error("authentication required")]
    AuthRequired,

    // Conflict
    #[error("habit already completed for this date")]
    AlreadyCompleted,
    #[error("a habit with this name already exists")]
    HabitExists,
    #[error("a reward with this name already exists")]
    RewardExists,
    #[error("reward already has recorded progress")]
    HasProgress,
    #[error("nothing to revert")]
    NothingToRevert,
    #[error("reward already claimed")]
    AlreadyClaimed,
    #[error("an api key with this name already exists")]
    ApiKeyNameExists,

    // Validation
    #[error("exempt_weekdays must only contain values 1-7")]
    InvalidWeekdays,
    #[error("invalid status filter")]
    InvalidStatus,
    #[error("cannot log a habit for a future date")]
    FutureDate,
    #[error("date is more than 7 days in the past")]
    TooOld,
    #[error("date is before the habit was created")]
    BeforeHabitCreation,
    #[error("reward has not reached the required pieces")]
    NotAchieved,

    // Rate / security
    #[error("rate limited")]
    RateLimited,
    #[error("invalid or expired code")]
    InvalidCode,
    #[error("this login method has been removed")]
    DeprecatedLogin,
}

impl DomainError {
    /// Machine-readable error code used in the REST error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::UserNotFound => "USER_NOT_FOUND",
            DomainError::HabitNotFound => "HABIT_NOT_FOUND",
            DomainError::RewardNotFound => "REWARD_NOT_FOUND",
            DomainError::LogNotFound => "LOG_NOT_FOUND",
            DomainError::NotOwner => "NOT_OWNER",
            DomainError::UserInactive => "USER_INACTIVE",
            DomainError::MissingToken => "MISSING_TOKEN",
            DomainError::InvalidToken => "INVALID_TOKEN",
            DomainError::TokenExpired => "TOKEN_EXPIRED",
            DomainError::InvalidTokenType => "INVALID_TOKEN_TYPE",
            DomainError::InvalidApiKey => "INVALID_API_KEY",
            DomainError::AuthRequired => "AUTH_REQUIRED",
            DomainError::AlreadyCompleted => "ALREADY_COMPLETED",
            DomainError::HabitExists => "HABIT_EXISTS",
            DomainError::RewardExists => "REWARD_EXISTS",
            DomainError::HasProgress => "HAS_PROGRESS",
            DomainError::NothingToRevert => "NOTHING_TO_REVERT",
            DomainError::AlreadyClaimed => "ALREADY_CLAIMED",
            DomainError::ApiKeyNameExists => "API_KEY_NAME_EXISTS",
            DomainError::InvalidWeekdays => "INVALID_WEEKDAYS",
            DomainError::InvalidStatus => "INVALID_STATUS",
            DomainError::FutureDate => "FUTURE_DATE",
            DomainError::TooOld => "TOO_OLD",
            DomainError::BeforeHabitCreation => "BEFORE_HABIT_CREATION",
            DomainError::NotAchieved => "NOT_ACHIEVED",
            DomainError::RateLimited => "RATE_LIMITED",
            DomainError::InvalidCode => "INVALID_CODE",
            DomainError::DeprecatedLogin => "DEPRECATED_LOGIN",
        }
    }

    /// Default HTTP status for this kind. Individual handlers may override
    /// (e.g. the refresh endpoint maps `UserNotFound`/`UserInactive` to 401
    /// rather than the usual 404/403, because in that flow they describe a
    /// token that no longer resolves to a usable session, not a missing
    /// resource).
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode as S;
        match self {
            DomainError::UserNotFound
            | DomainError::HabitNotFound
            | DomainError::RewardNotFound
            | DomainError::LogNotFound => S::NOT_FOUND,

            DomainError::NotOwner => S::FORBIDDEN,
            DomainError::UserInactive
            | DomainError::MissingToken
            | DomainError::InvalidToken
            | DomainError::TokenExpired
            | DomainError::InvalidTokenType
            | DomainError::InvalidApiKey
            | DomainError::AuthRequired => S::UNAUTHORIZED,

            DomainError::AlreadyCompleted
            | DomainError::HabitExists
            | DomainError::RewardExists
            | DomainError::HasProgress
            | DomainError::NothingToRevert
            | DomainError::AlreadyClaimed
            | DomainError::ApiKeyNameExists => S::CONFLICT,

            DomainError::InvalidWeekdays
            | DomainError::InvalidStatus
            | DomainError::FutureDate
            | DomainError::TooOld
            | DomainError::BeforeHabitCreation
            | DomainError::NotAchieved => S::UNPROCESSABLE_ENTITY,

            DomainError::RateLimited => S::TOO_MANY_REQUESTS,
            DomainError::InvalidCode => S::UNAUTHORIZED,
            DomainError::DeprecatedLogin => S::GONE,
        }
    }
}

/// Errors surfaced by a repository implementation. Kept independent of any
/// particular storage engine so the domain layer never leaks `sqlx` types.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Error type returned by the orchestration-level domain services
/// (completion, revert, and friends), which call several repositories and
/// so can fail either on a recoverable business rule or on the storage
/// layer itself.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Maps `RepoError::NotFound` to `not_found`, passes everything else through
/// as `OpError::Repo` (storage failure, not a business outcome).
pub fn not_found_as(not_found: DomainError) -> impl Fn(RepoError) -> OpError {
    move |e| match e {
        RepoError::NotFound => OpError::Domain(not_found),
        other => OpError::Repo(other),
    }
}
