use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::UserId;

use super::{Account, AccountRepository, NewAccount, RepositoryError};

#[derive(Debug)]
struct State {
    next_id: i64,
    accounts: BTreeMap<i64, Account>,
}

/// In-memory account repository for tests/dev. Ids start at 1.
#[derive(Debug)]
pub struct InMemoryAccountRepository {
    inner: RwLock<State>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(State {
                next_id: 1,
                accounts: BTreeMap::new(),
            }),
        }
    }
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("in-memory account store lock poisoned".to_string())
}

/// Uniqueness check against every account except `except`.
fn check_unique(state: &State, username: &str, email: &str, except: Option<UserId>) -> Result<(), RepositoryError> {
    for account in state.accounts.values() {
        if Some(account.id) == except {
            continue;
        }
        if account.username == username {
            return Err(RepositoryError::Conflict { field: "username" });
        }
        if account.email == email {
            return Err(RepositoryError::Conflict { field: "email" });
        }
    }
    Ok(())
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, RepositoryError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.accounts.get(&id.value()).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.accounts.values().find(|a| a.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.accounts.values().cloned().collect())
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        check_unique(&state, &account.username, &account.email, None)?;

        let id = state.next_id;
        state.next_id += 1;

        let account = account.into_account(UserId::new(id));
        state.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<Account, RepositoryError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        check_unique(&state, &account.username, &account.email, Some(account.id))?;

        let stored = state
            .accounts
            .get_mut(&account.id.value())
            .ok_or(RepositoryError::Missing(account.id))?;
        stored.username = account.username.clone();
        stored.email = account.email.clone();
        stored.password_hash = account.password_hash.clone();
        stored.role = account.role;
        Ok(stored.clone())
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        Ok(state.accounts.remove(&id.value()).is_some())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        let stored = state
            .accounts
            .get_mut(&id.value())
            .ok_or(RepositoryError::Missing(id))?;
        stored.last_login = Some(at);
        Ok(())
    }
}
