//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: composition root (stores, codec, services)
//! - `routes/`: HTTP handlers, one file per area, plus the route table
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: `ApiError` and the uniform error body

use std::any::Any;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use warden_auth::AccessTokenVerifier;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use errors::ApiError;
use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// Request flow, outermost first: trace, authenticate, render errors, catch
/// panics, route, authorize, handler.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let tokens: Arc<dyn AccessTokenVerifier> = services.tokens.clone();
    let auth_state = middleware::AuthState { tokens };
    let policy = Arc::new(routes::policy());

    routes::router()
        .route_layer(axum::middleware::from_fn_with_state(policy, middleware::authorize))
        .fallback(routes::system::fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(
                    auth_state,
                    middleware::authenticate,
                ))
                .layer(axum::middleware::from_fn(middleware::render_errors))
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(Extension(services)),
        )
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}
