//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_ACCOUNT_EVENTS_CHANNEL: &str = "user-deleted";
const DEFAULT_SESSION_STORE_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
    pub session_store_timeout: Duration,
    pub bcrypt_cost: u32,
    pub account_events_channel: String,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("redis", &self.redis_url.is_some())
            .field("database", &self.database_url.is_some())
            .field("session_store_timeout", &self.session_store_timeout)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("account_events_channel", &self.account_events_channel)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            redis_url: None,
            database_url: None,
            session_store_timeout: Duration::from_millis(DEFAULT_SESSION_STORE_TIMEOUT_MS),
            bcrypt_cost: warden_auth::PasswordHasher::default().cost(),
            account_events_channel: DEFAULT_ACCOUNT_EVENTS_CHANNEL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                defaults.jwt_secret
            }
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => parse("BIND_ADDR", &v)?,
            None => defaults.bind_addr,
        };

        let session_store_timeout = match get("SESSION_STORE_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(parse("SESSION_STORE_TIMEOUT_MS", &v)?),
            None => defaults.session_store_timeout,
        };

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(v) => {
                let cost: u32 = parse("BCRYPT_COST", &v)?;
                if !(4..=31).contains(&cost) {
                    return Err(ConfigError::Invalid {
                        name: "BCRYPT_COST",
                        value: v,
                        reason: "must be between 4 and 31".to_string(),
                    });
                }
                cost
            }
            None => defaults.bcrypt_cost,
        };

        Ok(Self {
            jwt_secret,
            bind_addr,
            redis_url: get("REDIS_URL"),
            database_url: get("DATABASE_URL"),
            session_store_timeout,
            bcrypt_cost,
            account_events_channel: get("ACCOUNT_EVENTS_CHANNEL").unwrap_or(defaults.account_events_channel),
        })
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: core::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
