//! Refresh-token session storage.
//!
//! One record per username holding the only refresh token currently accepted
//! for that user. `put` overwrites, so the latest login wins and every earlier
//! refresh token stops matching. Records expire after the refresh-token TTL.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemorySessionStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisSessionStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    /// Backend unreachable, timed out or failed; never retried.
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed storage of the single active refresh token per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert with the refresh-token TTL, replacing any previous token.
    async fn put(&self, username: &str, refresh_token: &str) -> Result<(), SessionStoreError>;

    async fn get(&self, username: &str) -> Result<Option<String>, SessionStoreError>;

    /// Idempotent: deleting an absent key is not an error.
    async fn delete(&self, username: &str) -> Result<(), SessionStoreError>;
}

#[async_trait]
impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    async fn put(&self, username: &str, refresh_token: &str) -> Result<(), SessionStoreError> {
        (**self).put(username, refresh_token).await
    }

    async fn get(&self, username: &str) -> Result<Option<String>, SessionStoreError> {
        (**self).get(username).await
    }

    async fn delete(&self, username: &str) -> Result<(), SessionStoreError> {
        (**self).delete(username).await
    }
}
