//! Error responses.
//!
//! Handlers return `ApiError`; its response carries an [`ErrorDetail`]
//! extension that the `render_errors` middleware turns into the uniform
//! `{status, message, path}` body once the request path is known.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use warden_auth::AuthzError;
use warden_core::DomainError;
use warden_infra::{AccountError, SessionError};

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const AUTHENTICATION_REQUIRED: &str = "Authentication required";
pub const ACCESS_DENIED: &str = "Access denied: insufficient permissions";
pub const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
pub const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    /// Refresh token rejected; rendered as `{error}` rather than the uniform shape.
    #[error("invalid refresh token")]
    TokenInvalid,

    #[error("access denied")]
    AccessDenied,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Detail is logged, never sent.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl core::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials | ApiError::Unauthenticated | ApiError::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::InvalidCredentials => INVALID_CREDENTIALS.to_string(),
            ApiError::Unauthenticated => AUTHENTICATION_REQUIRED.to_string(),
            ApiError::TokenInvalid => INVALID_REFRESH_TOKEN.to_string(),
            ApiError::AccessDenied => ACCESS_DENIED.to_string(),
            ApiError::NotFound(msg) | ApiError::Validation(msg) => msg.clone(),
            ApiError::Internal(_) => INTERNAL_ERROR.to_string(),
        }
    }
}

/// Marker attached to error responses; consumed by `render_errors`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
}

/// Wire shape of every error except refresh failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    pub path: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(detail = %detail, "request failed");
        }

        let status = self.status();
        let message = self.public_message();

        if let ApiError::TokenInvalid = self {
            return (status, Json(json!({ "error": message }))).into_response();
        }

        let body = Json(json!({ "status": status.as_u16(), "message": message }));
        let mut response = (status, body).into_response();
        response.extensions_mut().insert(ErrorDetail { message });
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(v) => ApiError::Validation(v.to_string()),
            DomainError::InvalidId(msg) => ApiError::Validation(msg),
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::AccessDenied => ApiError::AccessDenied,
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => ApiError::Unauthenticated,
            AuthzError::Forbidden(_) => ApiError::AccessDenied,
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Domain(e) => e.into(),
            other => ApiError::internal(other),
        }
    }
}

/// Login and logout mapping. Refresh maps its failures itself.
impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidCredentials => ApiError::InvalidCredentials,
            other => ApiError::internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::Violations;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenInvalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::AccessDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::internal("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let response = ApiError::internal("redis timed out").into_response();
        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.message, INTERNAL_ERROR);
    }

    #[test]
    fn refresh_failures_skip_the_uniform_shape() {
        let response = ApiError::TokenInvalid.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.extensions().get::<ErrorDetail>().is_none());
    }

    #[test]
    fn domain_errors_map_to_http() {
        let mut v = Violations::new();
        v.push("username", "Username can't be empty");
        v.push("email", "Email should be valid");

        match ApiError::from(DomainError::Validation(v)) {
            ApiError::Validation(msg) => {
                assert_eq!(msg, "username: Username can't be empty; email: Email should be valid")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(ApiError::from(DomainError::AccessDenied), ApiError::AccessDenied));
        assert!(matches!(
            ApiError::from(AuthzError::Forbidden("requires ROLE_ADMIN".into())),
            ApiError::AccessDenied
        ));
    }
}
