//! Redis-backed session store.
//!
//! Records live under `refresh_token:<username>` and are written with
//! `SET .. EX`, so Redis owns expiry. Each command runs under a deadline;
//! a timeout is reported the same way as a connection failure.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::RedisResult;
use redis::aio::ConnectionManager;
use tracing::{instrument, warn};

use warden_auth::claims::refresh_token_ttl;

use super::{SessionStore, SessionStoreError};

/// Default key namespace for session records.
const DEFAULT_KEY_PREFIX: &str = "refresh_token:";

#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    key_prefix: String,
    ttl_secs: u64,
    timeout: Duration,
}

impl core::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("key_prefix", &self.key_prefix)
            .field("ttl_secs", &self.ttl_secs)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RedisSessionStore {
    /// Connect to Redis (e.g. `redis://localhost:6379`).
    ///
    /// `timeout` bounds the initial connection and every later command.
    pub async fn connect(redis_url: impl AsRef<str>, timeout: Duration) -> Result<Self, SessionStoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?;

        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| SessionStoreError::Unavailable("timed out connecting to redis".to_string()))?
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            conn,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl_secs: refresh_token_ttl().num_seconds().max(1) as u64,
            timeout,
        })
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, username: &str) -> String {
        format!("{}{}", self.key_prefix, username)
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T, SessionStoreError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "redis session command failed");
                Err(SessionStoreError::Unavailable(e.to_string()))
            }
            Err(_) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "redis session command timed out");
                Err(SessionStoreError::Unavailable(format!("{op} timed out")))
            }
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    #[instrument(skip(self, refresh_token), fields(username = %username))]
    async fn put(&self, username: &str, refresh_token: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("SET")
            .arg(self.key(username))
            .arg(refresh_token)
            .arg("EX")
            .arg(self.ttl_secs)
            .to_owned();

        self.run("SET", async move { cmd.query_async::<_, ()>(&mut conn).await })
            .await
    }

    #[instrument(skip(self), fields(username = %username))]
    async fn get(&self, username: &str) -> Result<Option<String>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("GET").arg(self.key(username)).to_owned();

        self.run("GET", async move { cmd.query_async::<_, Option<String>>(&mut conn).await })
            .await
    }

    #[instrument(skip(self), fields(username = %username))]
    async fn delete(&self, username: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("DEL").arg(self.key(username)).to_owned();

        self.run("DEL", async move { cmd.query_async::<_, i64>(&mut conn).await })
            .await
            .map(|_| ())
    }
}
