use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::PgPool;

mod auth;
mod config;
mod db;
mod domain;
mod dto;
mod error;
mod handlers;
mod models;
mod repositories;

use auth::rate_limit::RateLimitState;
use config::Config;
use domain::api_key::ApiKeyService;
use domain::audit::AuditService;
use domain::auth_code::AuthCodeService;
use domain::completion::CompletionEngine;
use domain::revert::RevertEngine;
use repositories::postgres::{
    PgApiKeyStore, PgAuditStore, PgAuthCodeStore, PgCompletionStore, PgHabitStore, PgLogStore,
    PgProgressStore, PgRewardStore, PgUserStore,
};
use repositories::{AuditStore, AuthCodeStore, HabitStore, LogStore, ProgressStore, RewardStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub habits: Arc<dyn HabitStore>,
    pub rewards: Arc<dyn RewardStore>,
    pub progress: Arc<dyn ProgressStore>,
    pub logs: Arc<dyn LogStore>,
    pub audit: Arc<AuditService>,
    pub auth_codes: Arc<AuthCodeService>,
    pub api_keys: Arc<ApiKeyService>,
    pub completion_engine: Arc<CompletionEngine>,
    pub revert_engine: Arc<RevertEngine>,
    pub rate_limiter: RateLimitState,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habitreward_core=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());
    if config.jwt_secret_is_ephemeral {
        tracing::warn!("running with an ephemeral JWT signing key — all tokens invalidate on restart");
    }

    let db = db::create_pool(&config.database_url).await;

    sqlx::migrate!("./migrations_v2")
        .run(&db)
        .await
        .expect("failed to run database migrations");
    tracing::info!("database migrations applied");

    let users: Arc<dyn UserStore> = Arc::new(PgUserStore { pool: db.clone() });
    let habits: Arc<dyn HabitStore> = Arc::new(PgHabitStore { pool: db.clone() });
    let rewards: Arc<dyn RewardStore> = Arc::new(PgRewardStore { pool: db.clone() });
    let progress: Arc<dyn ProgressStore> = Arc::new(PgProgressStore { pool: db.clone() });
    let logs: Arc<dyn LogStore> = Arc::new(PgLogStore { pool: db.clone() });
    let audit_store = Arc::new(PgAuditStore { pool: db.clone() });
    let auth_code_store = Arc::new(PgAuthCodeStore { pool: db.clone() });
    let api_key_store = Arc::new(PgApiKeyStore { pool: db.clone() });
    let completion_store = Arc::new(PgCompletionStore { pool: db.clone() });

    let audit = Arc::new(AuditService { store: audit_store.clone() });
    let auth_codes = Arc::new(AuthCodeService {
        users: users.clone(),
        codes: auth_code_store.clone(),
    });
    let api_keys = Arc::new(ApiKeyService {
        users: users.clone(),
        keys: api_key_store.clone(),
    });
    let completion_engine = Arc::new(CompletionEngine {
        users: users.clone(),
        habits: habits.clone(),
        rewards: rewards.clone(),
        progress: progress.clone(),
        logs: logs.clone(),
        audit: audit_store.clone(),
        completions: completion_store.clone(),
    });
    let revert_engine = Arc::new(RevertEngine {
        users: users.clone(),
        habits: habits.clone(),
        logs: logs.clone(),
        rewards: rewards.clone(),
        audit: audit_store.clone(),
        completions: completion_store.clone(),
    });

    let rate_limiter = RateLimitState::new();

    let state = AppState {
        db: db.clone(),
        config: config.clone(),
        users,
        habits,
        rewards,
        progress,
        logs,
        audit,
        auth_codes,
        api_keys,
        completion_engine,
        revert_engine,
        rate_limiter,
    };

    spawn_auth_code_cleanup_worker(auth_code_store.clone());
    spawn_audit_retention_worker(audit_store.clone(), config.audit_retention_days);

    let auth_routes = Router::new()
        .route("/v1/auth/request-code", post(handlers::auth::request_code))
        .route("/v1/auth/verify-code", post(handlers::auth::verify_code))
        .route("/v1/auth/refresh", post(handlers::auth::refresh))
        .route("/v1/auth/logout", post(handlers::auth::logout))
        .route("/v1/auth/login", post(handlers::auth::deprecated_login));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(auth_routes);

    let protected_routes = Router::new()
        .route("/v1/users/me", get(handlers::users::get_me))
        .route("/v1/users/me", patch(handlers::users::update_me))
        // Habits
        .route("/v1/habits", get(handlers::habits::list_habits))
        .route("/v1/habits", post(handlers::habits::create_habit))
        .route("/v1/habits/:id", patch(handlers::habits::update_habit))
        .route("/v1/habits/:id", delete(handlers::habits::delete_habit))
        // Completions / reverts
        .route("/v1/habits/:id/complete", post(handlers::completions::complete_habit))
        .route("/v1/habits/batch-complete", post(handlers::completions::batch_complete))
        .route("/v1/habit-logs", get(handlers::completions::list_logs))
        .route("/v1/habit-logs/:id", delete(handlers::completions::revert_log))
        // Rewards
        .route("/v1/rewards", get(handlers::rewards::list_rewards))
        .route("/v1/rewards", post(handlers::rewards::create_reward))
        .route("/v1/rewards/:id/claim", post(handlers::rewards::claim_reward))
        // Streaks
        .route("/v1/streaks", get(handlers::streaks::list_streaks))
        .route("/v1/streaks/:habit_id", get(handlers::streaks::streak_detail))
        // API keys
        .route("/v1/api-keys", get(handlers::api_keys::list_keys))
        .route("/v1/api-keys", post(handlers::api_keys::create_key))
        .route("/v1/api-keys/:id", delete(handlers::api_keys::revoke_key))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(
            config
                .frontend_url
                .parse::<axum::http::HeaderValue>()
                .expect("FRONTEND_URL must be a valid header value"),
        )
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static("x-api-key"),
        ]);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_requests,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!(%addr, "starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .unwrap();
}

/// Periodic sweeper: deletes expired/used-up auth-code rows so the table
/// doesn't grow unbounded.
fn spawn_auth_code_cleanup_worker(codes: Arc<PgAuthCodeStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            match codes.cleanup_expired(chrono::Utc::now()).await {
                Ok(count) if count > 0 => tracing::debug!(count, "cleaned up expired auth codes"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "auth code cleanup sweep failed"),
            }
        }
    });
}

/// Periodic sweeper: enforces the audit-log retention window (default 90
/// days per the data model).
fn spawn_audit_retention_worker(audit: Arc<PgAuditStore>, retention_days: i64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match audit.cleanup(retention_days).await {
                Ok(count) if count > 0 => tracing::debug!(count, "swept audit log retention"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "audit log retention sweep failed"),
            }
        }
    });
}
