use axum::Router;
use axum::routing::{delete, get, patch, post};

use warden_auth::{Requirement, Role, RoutePolicy, RouteRule};

pub mod admin;
pub mod auth;
pub mod people;
pub mod system;

/// Who may call what. Routes missing from this table require an identity.
pub const ROUTE_TABLE: &[RouteRule] = &[
    RouteRule::new("POST", "/login", Requirement::Public),
    RouteRule::new("POST", "/registration", Requirement::Public),
    RouteRule::new("GET", "/health", Requirement::Public),
    RouteRule::new("GET", "/profile", Requirement::Authenticated),
    RouteRule::new("PATCH", "/update", Requirement::Authenticated),
    RouteRule::new("DELETE", "/delete", Requirement::Authenticated),
    RouteRule::new("GET", "/refresh", Requirement::Authenticated),
    RouteRule::new("POST", "/logout", Requirement::Authenticated),
    RouteRule::new("PATCH", "/admin/promote", Requirement::Role(Role::User)),
    RouteRule::new("GET", "/admin/all-users", Requirement::Role(Role::Admin)),
    RouteRule::new("GET", "/admin/stats", Requirement::Role(Role::Admin)),
    RouteRule::new("DELETE", "/admin/delete/:id", Requirement::Role(Role::Admin)),
];

pub fn policy() -> RoutePolicy {
    RoutePolicy::new(ROUTE_TABLE.iter().cloned())
}

/// Every endpoint, without middleware.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/login", post(auth::login))
        .route("/refresh", get(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/registration", post(people::register))
        .route("/profile", get(people::profile))
        .route("/update", patch(people::update))
        .route("/delete", delete(people::delete_self))
        .route("/admin/promote", patch(admin::promote))
        .route("/admin/all-users", get(admin::all_users))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/delete/:id", delete(admin::delete_user))
}
