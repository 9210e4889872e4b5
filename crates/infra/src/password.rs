//! bcrypt work moved off the async workers.

use tracing::error;

use warden_auth::{PasswordError, PasswordHasher};

pub(crate) async fn hash_password(hasher: PasswordHasher, plain: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hasher.hash(&plain))
        .await
        .map_err(|e| PasswordError::Hash(e.to_string()))?
}

/// A join failure counts as a mismatch.
pub(crate) async fn verify_password(hasher: PasswordHasher, plain: String, hash: String) -> bool {
    match tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash)).await {
        Ok(matches) => matches,
        Err(e) => {
            error!(error = %e, "password verification task failed");
            false
        }
    }
}
