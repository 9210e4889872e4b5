//! Request pipeline stages.
//!
//! ```text
//! authenticate   bearer token -> Identity extension (never rejects)
//! render_errors  ApiError responses -> {status, message, path}
//! authorize      route table check against the matched route (401/403)
//! ```

use std::sync::Arc;

use axum::Json;
use axum::extract::{MatchedPath, Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::debug;

use warden_auth::{AccessTokenVerifier, Identity, RoutePolicy};

use crate::app::errors::{ApiError, ErrorBody, ErrorDetail};

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn AccessTokenVerifier>,
}

/// Authentication filter.
///
/// A missing, malformed, expired or forged bearer token leaves the request
/// anonymous; the 401/403 decision belongs to `authorize`.
pub async fn authenticate(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    if req.extensions().get::<Identity>().is_none() {
        let identity = extract_bearer(req.headers()).and_then(|token| {
            state
                .tokens
                .verify_access(token, Utc::now())
                .map_err(|e| debug!(error = %e, "bearer token rejected; continuing anonymously"))
                .ok()
        });

        if let Some(identity) = identity {
            req.extensions_mut().insert(identity);
        }
    }

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Route guard, installed with `route_layer` so the matched template is known.
pub async fn authorize(State(policy): State<Arc<RoutePolicy>>, req: Request, next: Next) -> Result<Response, ApiError> {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    if let Err(e) = policy.check(req.method().as_str(), &route, req.extensions().get::<Identity>()) {
        debug!(method = %req.method(), route = %route, error = %e, "request denied");
        return Err(e.into());
    }

    Ok(next.run(req).await)
}

/// Rewrites error responses into `{status, message, path}`.
pub async fn render_errors(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, _body) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let body = ErrorBody {
        status: parts.status.as_u16(),
        message: detail.message,
        path,
    };
    (parts, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("Bearer    ")), None);
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer(&headers("bearer abc")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
