//! Login, refresh and logout.
//!
//! The refresh token travels only in the `refreshToken` cookie
//! (`HttpOnly; SameSite=Lax; Path=/`), never in a response body.

use std::sync::Arc;

use axum::Json;
use axum::extract::Extension;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use warden_auth::claims::refresh_token_ttl;

use crate::app::dto::{AccessTokenResponse, ApiJson, JwtResponse, LoginRequest, MessageResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub const REFRESH_COOKIE: &str = "refreshToken";
pub const LOGGED_OUT: &str = "Logged out successfully";

fn session_cookie(value: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}"
    ))
    .map_err(ApiError::internal)
}

pub fn refresh_cookie(token: &str) -> Result<HeaderValue, ApiError> {
    session_cookie(token, refresh_token_ttl().num_seconds())
}

pub fn cleared_cookie() -> Result<HeaderValue, ApiError> {
    session_cookie("", 0)
}

fn presented_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Clears the cookie and confirms the logout.
pub fn logged_out_response() -> Result<Response, ApiError> {
    let body = MessageResponse {
        message: LOGGED_OUT.to_string(),
    };
    Ok(([(header::SET_COOKIE, cleared_cookie()?)], Json(body)).into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let outcome = services.sessions.login(&body.username, &body.password).await?;

    let cookie = refresh_cookie(&outcome.refresh_token)?;
    let account = outcome.account;
    let body = JwtResponse {
        access_token: outcome.access_token,
        id: account.id,
        username: account.username,
        email: account.email,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Every failure except a backend outage is the same 401.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    jar: CookieJar,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let Some(token) = presented_token(&jar) else {
        debug!("refresh without a refresh-token cookie");
        return Err(ApiError::TokenInvalid);
    };

    match services.sessions.refresh(&token).await {
        Ok(access_token) => Ok(Json(AccessTokenResponse { access_token })),
        Err(e) if e.is_unavailable() => Err(ApiError::internal(e)),
        Err(e) => {
            debug!(error = %e, "refresh rejected");
            Err(ApiError::TokenInvalid)
        }
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    services.sessions.logout(presented_token(&jar).as_deref()).await?;
    logged_out_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_cookie_attributes() {
        let cookie = refresh_cookie("abc.def.ghi").unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "refreshToken=abc.def.ghi; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800"
        );
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = cleared_cookie().unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "refreshToken=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
        );
    }
}
