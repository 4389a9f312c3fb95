use std::env;

use rand::RngCore;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    /// Signing secret for REST JWTs. Falls back to a per-process ephemeral
    /// key (with a loud warning) when `API_SECRET_KEY` is unset, so a dev
    /// box without a configured secret still boots — but every restart
    /// invalidates outstanding tokens.
    pub jwt_secret: String,
    pub jwt_secret_is_ephemeral: bool,
    pub jwt_access_ttl_secs: i64,
    pub jwt_refresh_ttl_secs: i64,

    pub auth_code_ttl_minutes: i64,
    pub auth_code_rate_limit_per_hour: i64,
    pub auth_code_lockout_threshold: i32,
    pub auth_code_lockout_minutes: i64,

    pub audit_retention_days: i64,

    pub request_timeout_secs: u64,
    pub webhook_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let (jwt_secret, jwt_secret_is_ephemeral) = match env::var("API_SECRET_KEY") {
            Ok(s) if !s.is_empty() => (s, false),
            _ => {
                tracing::warn!(
                    "API_SECRET_KEY not set — generating an ephemeral per-process signing key; \
                     all issued tokens will be invalidated on restart"
                );
                (generate_ephemeral_secret(), true)
            }
        };

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret,
            jwt_secret_is_ephemeral,
            jwt_access_ttl_secs: env::var("JWT_ACCESS_TTL_SECS")
                .unwrap_or_else(|_| "900".into())
                .parse()
                .expect("JWT_ACCESS_TTL_SECS must be a number"),
            jwt_refresh_ttl_secs: env::var("JWT_REFRESH_TTL_SECS")
                .unwrap_or_else(|_| "604800".into())
                .parse()
                .expect("JWT_REFRESH_TTL_SECS must be a number"),

            auth_code_ttl_minutes: env::var("AUTH_CODE_TTL_MINUTES")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .unwrap_or(5),
            auth_code_rate_limit_per_hour: env::var("AUTH_CODE_RATE_LIMIT_PER_HOUR")
                .unwrap_or_else(|_| "3".into())
                .parse()
                .unwrap_or(3),
            auth_code_lockout_threshold: env::var("AUTH_CODE_LOCKOUT_THRESHOLD")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .unwrap_or(5),
            auth_code_lockout_minutes: env::var("AUTH_CODE_LOCKOUT_MINUTES")
                .unwrap_or_else(|_| "15".into())
                .parse()
                .unwrap_or(15),

            audit_retention_days: env::var("AUDIT_RETENTION_DAYS")
                .unwrap_or_else(|_| "90".into())
                .parse()
                .unwrap_or(90),

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),
            webhook_timeout_secs: env::var("WEBHOOK_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn generate_ephemeral_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
