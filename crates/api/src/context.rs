use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use warden_auth::Identity;

use crate::app::errors::ApiError;

/// Identity established by the authentication filter for this request.
///
/// Handlers take this as a parameter instead of consulting ambient state.
/// Extraction fails with 401 when the request is anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentIdentity(pub Identity);

impl CurrentIdentity {
    pub fn into_inner(self) -> Identity {
        self.0
    }
}

impl core::ops::Deref for CurrentIdentity {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or(ApiError::Unauthenticated)
    }
}
