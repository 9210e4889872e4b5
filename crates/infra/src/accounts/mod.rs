//! Account persistence.
//!
//! The repository owns identity assignment, username/email uniqueness and the
//! last-login timestamp. Password hashes are stored as produced by the hasher;
//! the repository never sees plaintext.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use warden_auth::Role;
use warden_core::UserId;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryAccountRepository;
pub use postgres::PostgresAccountRepository;

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
}

/// An account that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub role: Role,
}

impl NewAccount {
    fn into_account(self, id: UserId) -> Account {
        Account {
            id,
            username: self.username,
            password_hash: self.password_hash,
            email: self.email,
            role: self.role,
            last_login: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Username or email already belongs to another account.
    #[error("{field} is already taken")]
    Conflict { field: &'static str },

    #[error("account {0} not found")]
    Missing(UserId),

    #[error("account storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError>;

    /// All accounts ordered by id.
    async fn list(&self) -> Result<Vec<Account>, RepositoryError>;

    async fn insert(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    /// Overwrite username, email, password hash and role of an existing account.
    async fn update(&self, account: &Account) -> Result<Account, RepositoryError>;

    /// Returns `false` when no such account existed.
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<R> AccountRepository for Arc<R>
where
    R: AccountRepository + ?Sized,
{
    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        (**self).find_by_username(username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        (**self).find_by_email(email).await
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        (**self).list().await
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        (**self).insert(account).await
    }

    async fn update(&self, account: &Account) -> Result<Account, RepositoryError> {
        (**self).update(account).await
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        (**self).delete(id).await
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        (**self).record_login(id, at).await
    }
}
