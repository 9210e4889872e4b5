use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::UserId;

use crate::Role;

/// Issuer pinned on every token this service mints.
pub const ISSUER: &str = "ADMIN";

/// Subject of access tokens. Doubles as the token-type discriminator.
pub const ACCESS_SUBJECT: &str = "User details";

/// Subject of refresh tokens.
pub const REFRESH_SUBJECT: &str = "RefreshToken";

/// Access tokens live for one hour.
pub fn access_token_ttl() -> Duration {
    Duration::minutes(60)
}

/// Refresh tokens (and their session records) live for seven days.
pub fn refresh_token_ttl() -> Duration {
    Duration::days(7)
}

/// Claims carried by an access token.
///
/// Timestamps are JWT NumericDates (whole seconds since the epoch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,

    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl AccessClaims {
    pub fn new(user_id: UserId, username: impl Into<String>, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            sub: ACCESS_SUBJECT.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + access_token_ttl()).timestamp(),
            id: user_id,
            username: username.into(),
            role,
        }
    }
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,

    pub username: String,
}

impl RefreshClaims {
    pub fn new(username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            sub: REFRESH_SUBJECT.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + refresh_token_ttl()).timestamp(),
            username: username.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate a token's validity window.
///
/// A token is valid for `issued_at <= now < expires_at`.
pub fn validate_window(issued_at: i64, expires_at: i64, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if expires_at <= issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
