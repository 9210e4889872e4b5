use axum::extract::Request;
use axum::http::StatusCode;

use warden_auth::Identity;

use crate::app::errors::ApiError;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Unknown routes: anonymous callers get 401 (deny by default), others 404.
pub async fn fallback(req: Request) -> ApiError {
    if req.extensions().get::<Identity>().is_none() {
        return ApiError::Unauthenticated;
    }
    ApiError::NotFound(format!("No route for {} {}", req.method(), req.uri().path()))
}
