//! Registration and profile self-service.

use std::sync::Arc;

use axum::Json;
use axum::extract::Extension;
use axum::http::StatusCode;

use crate::app::dto::{ApiJson, PersonRequest, PersonResponse, PersonUpdate};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CurrentIdentity;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<PersonRequest>,
) -> Result<(StatusCode, Json<PersonResponse>), ApiError> {
    let account = services.accounts.register(body.into()).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    identity: CurrentIdentity,
) -> Result<Json<PersonResponse>, ApiError> {
    let account = services.accounts.profile(identity.user_id()).await?;
    Ok(Json(account.into()))
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    identity: CurrentIdentity,
    ApiJson(body): ApiJson<PersonUpdate>,
) -> Result<Json<PersonResponse>, ApiError> {
    let account = services.accounts.update(identity.user_id(), body.into()).await?;
    Ok(Json(account.into()))
}

pub async fn delete_self(
    Extension(services): Extension<Arc<AppServices>>,
    identity: CurrentIdentity,
) -> Result<String, ApiError> {
    let id = identity.user_id();
    services.accounts.delete(&identity, id).await?;
    Ok(format!("User's account with id {id} successfully deleted."))
}
