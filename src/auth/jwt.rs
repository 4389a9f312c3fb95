//! Stateless signed tokens. No server-side session store: a refresh
//! token's validity rests entirely on its signature and `exp` claim. A
//! blacklist for revoked refresh tokens is a known gap, left out of scope.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::error::DomainError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub telegram_id: Option<String>,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

fn create(user_id: Uuid, telegram_id: &str, token_type: TokenType, ttl_secs: i64, config: &Config) -> Result<String, DomainError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        telegram_id: Some(telegram_id.to_string()),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        iat: now.timestamp(),
        token_type,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "failed to sign token");
        DomainError::InvalidToken
    })
}

pub fn create_access_token(user_id: Uuid, telegram_id: &str, config: &Config) -> Result<String, DomainError> {
    create(user_id, telegram_id, TokenType::Access, config.jwt_access_ttl_secs, config)
}

pub fn create_refresh_token(user_id: Uuid, telegram_id: &str, config: &Config) -> Result<String, DomainError> {
    create(user_id, telegram_id, TokenType::Refresh, config.jwt_refresh_ttl_secs, config)
}

pub fn create_token_pair(user_id: Uuid, telegram_id: &str, config: &Config) -> Result<TokenPair, DomainError> {
    Ok(TokenPair {
        access_token: create_access_token(user_id, telegram_id, config)?,
        refresh_token: create_refresh_token(user_id, telegram_id, config)?,
        expires_in: config.jwt_access_ttl_secs,
    })
}

pub fn verify_token(token: &str, expected: TokenType, config: &Config) -> Result<TokenData<Claims>, DomainError> {
    let validation = Validation::default();
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => DomainError::TokenExpired,
        _ => DomainError::InvalidToken,
    })?;

    if data.claims.token_type != expected {
        return Err(DomainError::InvalidTokenType);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: String::new(),
            host: "0.0.0.0".into(),
            port: 8080,
            frontend_url: String::new(),
            jwt_secret: "test-secret".into(),
            jwt_secret_is_ephemeral: false,
            jwt_access_ttl_secs: 900,
            jwt_refresh_ttl_secs: 604800,
            auth_code_ttl_minutes: 5,
            auth_code_rate_limit_per_hour: 3,
            auth_code_lockout_threshold: 5,
            auth_code_lockout_minutes: 15,
            audit_retention_days: 90,
            request_timeout_secs: 10,
            webhook_timeout_secs: 30,
        }
    }

    #[test]
    fn round_trips_access_token() {
        let cfg = config();
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, "123", &cfg).unwrap();
        let data = verify_token(&token, TokenType::Access, &cfg).unwrap();
        assert_eq!(data.claims.sub, user_id);
    }

    #[test]
    fn rejects_wrong_token_type() {
        let cfg = config();
        let user_id = Uuid::new_v4();
        let token = create_refresh_token(user_id, "123", &cfg).unwrap();
        let err = verify_token(&token, TokenType::Access, &cfg).unwrap_err();
        assert_eq!(err, DomainError::InvalidTokenType);
    }
}
