use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use warden_auth::Role;
use warden_core::UserId;
use warden_infra::{Account, AccountChanges, Registration};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PersonRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

impl From<PersonRequest> for Registration {
    fn from(dto: PersonRequest) -> Self {
        Registration {
            username: dto.username,
            password: dto.password,
            email: dto.email,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PersonUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

impl From<PersonUpdate> for AccountChanges {
    fn from(dto: PersonUpdate) -> Self {
        AccountChanges {
            username: dto.username,
            password: dto.password,
            email: dto.email,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub code: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtResponse {
    pub access_token: String,
    pub id: UserId,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PersonResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<Account> for PersonResponse {
    fn from(a: Account) -> Self {
        PersonResponse {
            id: a.id,
            username: a.username,
            email: a.email,
            role: a.role,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<Account> for UserStats {
    fn from(a: Account) -> Self {
        UserStats {
            id: a.id,
            username: a.username,
            email: a.email,
            role: a.role,
            last_login: a.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// -------------------------
// Extractors
// -------------------------

/// JSON body extractor whose rejection is a 400 `ApiError`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(malformed_body(rejection)),
        }
    }
}

fn malformed_body(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(format!("Malformed request body: {}", rejection.body_text()))
}
