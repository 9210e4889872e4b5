use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use warden_auth::claims::refresh_token_ttl;

use super::{SessionStore, SessionStoreError};

#[derive(Debug, Clone)]
struct Entry {
    token: String,
    expires_at: DateTime<Utc>,
}

/// In-process session store for tests/dev.
///
/// Expired records are evicted lazily when read.
#[derive(Debug)]
pub struct InMemorySessionStore {
    inner: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_ttl(refresh_token_ttl())
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> SessionStoreError {
    SessionStoreError::Unavailable("in-memory session store lock poisoned".to_string())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, username: &str, refresh_token: &str) -> Result<(), SessionStoreError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        map.insert(
            username.to_string(),
            Entry {
                token: refresh_token.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, username: &str) -> Result<Option<String>, SessionStoreError> {
        let now = Utc::now();
        {
            let map = self.inner.read().map_err(poisoned)?;
            match map.get(username) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.token.clone())),
                Some(_) => {}
            }
        }

        let mut map = self.inner.write().map_err(poisoned)?;
        if map.get(username).is_some_and(|e| e.expires_at <= now) {
            map.remove(username);
        }
        Ok(None)
    }

    async fn delete(&self, username: &str) -> Result<(), SessionStoreError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        map.remove(username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_token() {
        let store = InMemorySessionStore::new();
        store.put("john", "token-a").await.unwrap();
        assert_eq!(store.get("john").await.unwrap().as_deref(), Some("token-a"));
        assert_eq!(store.get("maria").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_previous_token() {
        let store = InMemorySessionStore::new();
        store.put("john", "token-a").await.unwrap();
        store.put("john", "token-b").await.unwrap();

        assert_eq!(store.get("john").await.unwrap().as_deref(), Some("token-b"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemorySessionStore::new();
        store.put("john", "token-a").await.unwrap();

        store.delete("john").await.unwrap();
        store.delete("john").await.unwrap();
        store.delete("never-existed").await.unwrap();

        assert_eq!(store.get("john").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_records_are_gone() {
        let store = InMemorySessionStore::with_ttl(Duration::zero());
        store.put("john", "token-a").await.unwrap();

        assert_eq!(store.get("john").await.unwrap(), None);
        assert!(store.is_empty());
    }
}
