//! Administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path};
use axum::response::Response;

use warden_core::UserId;

use crate::app::dto::{ApiJson, CodeRequest, PersonResponse, UserStats};
use crate::app::errors::ApiError;
use crate::app::routes::auth::logged_out_response;
use crate::app::services::AppServices;
use crate::context::CurrentIdentity;

/// Promote the caller to ADMIN; the caller is logged out and must sign in again.
pub async fn promote(
    Extension(services): Extension<Arc<AppServices>>,
    identity: CurrentIdentity,
    ApiJson(body): ApiJson<CodeRequest>,
) -> Result<Response, ApiError> {
    services.accounts.promote(identity.user_id(), &body.code).await?;
    logged_out_response()
}

pub async fn all_users(Extension(services): Extension<Arc<AppServices>>) -> Result<Json<Vec<PersonResponse>>, ApiError> {
    let accounts = services.accounts.list().await?;
    Ok(Json(accounts.into_iter().map(PersonResponse::from).collect()))
}

pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> Result<Json<Vec<UserStats>>, ApiError> {
    let accounts = services.accounts.list().await?;
    Ok(Json(accounts.into_iter().map(UserStats::from).collect()))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    identity: CurrentIdentity,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let id: UserId = id.parse()?;
    services.accounts.delete(&identity, id).await?;
    Ok(format!("User with ID {id} was deleted by admin"))
}
