use std::env;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub cors_allowed_origin: String,
    pub jwt_secret: SecretString,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub store_timeout_ms: u64,
    pub resolve_token_subject: bool,
}

/// Immutable settings for the credential and token core, built once at startup and
/// handed to `CredentialHasher`, `TokenCodec` and `AccessAuthority`.
#[derive(Clone)]
pub struct AuthSettings {
    pub signing_key: SecretString,
    pub token_ttl: chrono::Duration,
    pub hash_cost: u32,
    pub store_timeout: Duration,
    pub resolve_subject: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: "must not be empty".into(),
            });
        }

        let bcrypt_cost = parse_or("BCRYPT_COST", 12u32)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                reason: format!("{} is outside 4..=31", bcrypt_cost),
            });
        }

        let token_ttl_hours = parse_or("TOKEN_TTL_HOURS", 24i64)?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_HOURS",
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            server_port: parse_or("SERVER_PORT", 8080u16)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5174".to_string()),
            jwt_secret: SecretString::from(jwt_secret),
            token_ttl_hours,
            bcrypt_cost,
            store_timeout_ms: parse_or("STORE_TIMEOUT_MS", 5000u64)?,
            resolve_token_subject: parse_or("RESOLVE_TOKEN_SUBJECT", true)?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            signing_key: self.jwt_secret.clone(),
            token_ttl: chrono::Duration::hours(self.token_ttl_hours),
            hash_cost: self.bcrypt_cost,
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            resolve_subject: self.resolve_token_subject,
        }
    }
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
