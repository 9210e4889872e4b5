//! Session lifecycle: login, refresh and logout.
//!
//! ```text
//! login(username, password)
//!   ↓ credentials checked against the account repository
//!   ↓ access + refresh token minted
//!   ↓ refresh token stored under the username (replaces any earlier session)
//!
//! refresh(token)
//!   ↓ token verified as a refresh token
//!   ↓ token must equal the stored one for that username
//!   ↓ role re-read from the repository, new access token minted
//!
//! logout(token?)
//!   ↓ username recovered from the token, session record deleted
//! ```
//!
//! The manager composes traits only; it performs no IO of its own.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use warden_auth::{PasswordHasher, TokenCodec, TokenError};

use crate::accounts::{Account, AccountRepository, RepositoryError};
use crate::password::verify_password;
use crate::session_store::{SessionStore, SessionStoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Unknown username or wrong password; callers must not tell which.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    /// Refresh token verified but is not the active one for its user.
    #[error("refresh token is not the active session")]
    Revoked,

    /// Refresh token names a user that no longer exists.
    #[error("account '{0}' no longer exists")]
    UnknownAccount(String),

    #[error(transparent)]
    Store(#[from] SessionStoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SessionError {
    /// Whether this failure is an infrastructure fault rather than a bad credential.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SessionError::Store(_) | SessionError::Repository(RepositoryError::Unavailable(_))
        )
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub account: Account,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    Ended { username: String },
    /// No usable refresh token was presented; nothing to delete.
    AlreadyLoggedOut,
}

/// Plaintext behind the stand-in hash checked for unknown usernames.
const DUMMY_PASSWORD: &str = "warden-unknown-account";

pub struct SessionManager {
    tokens: Arc<TokenCodec>,
    sessions: Arc<dyn SessionStore>,
    accounts: Arc<dyn AccountRepository>,
    hasher: PasswordHasher,
    /// Hashed at the configured cost so both login failure paths do the same bcrypt work.
    dummy_hash: Option<String>,
}

impl SessionManager {
    pub fn new(
        tokens: Arc<TokenCodec>,
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountRepository>,
        hasher: PasswordHasher,
    ) -> Self {
        let dummy_hash = hasher
            .hash(DUMMY_PASSWORD)
            .map_err(|e| warn!(error = %e, "failed to prepare stand-in password hash"))
            .ok();
        Self {
            tokens,
            sessions,
            accounts,
            hasher,
            dummy_hash,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenCodec> {
        &self.tokens
    }

    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, SessionError> {
        let mut account = self.authenticate(username, password).await?;

        let access_token = self
            .tokens
            .issue_access_token(account.id, &account.username, account.role)?;
        let refresh_token = self.tokens.issue_refresh_token(&account.username)?;

        self.sessions.put(&account.username, &refresh_token).await?;

        let now = Utc::now();
        match self.accounts.record_login(account.id, now).await {
            Ok(()) => account.last_login = Some(now),
            Err(e) => warn!(user_id = %account.id, error = %e, "failed to record last login"),
        }

        info!(user_id = %account.id, role = %account.role, "login succeeded");
        Ok(LoginOutcome {
            access_token,
            refresh_token,
            account,
        })
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Account, SessionError> {
        let Some(account) = self.accounts.find_by_username(username).await? else {
            if let Some(dummy) = &self.dummy_hash {
                verify_password(self.hasher, password.to_string(), dummy.clone()).await;
            }
            debug!("login for unknown username");
            return Err(SessionError::InvalidCredentials);
        };

        if !verify_password(self.hasher, password.to_string(), account.password_hash.clone()).await {
            debug!("login with wrong password");
            return Err(SessionError::InvalidCredentials);
        }
        Ok(account)
    }

    /// Exchange an active refresh token for a new access token.
    #[instrument(skip_all)]
    pub async fn refresh(&self, presented: &str) -> Result<String, SessionError> {
        let username = self.tokens.verify_refresh_token(presented)?;

        let stored = self.sessions.get(&username).await?;
        if stored.as_deref() != Some(presented) {
            debug!(username = %username, "refresh token does not match the stored session");
            return Err(SessionError::Revoked);
        }

        let account = self
            .accounts
            .find_by_username(&username)
            .await?
            .ok_or_else(|| SessionError::UnknownAccount(username.clone()))?;

        let access_token = self
            .tokens
            .issue_access_token(account.id, &account.username, account.role)?;
        debug!(user_id = %account.id, "access token refreshed");
        Ok(access_token)
    }

    /// End the session named by `presented`.
    ///
    /// A missing or unverifiable token counts as already logged out.
    #[instrument(skip_all)]
    pub async fn logout(&self, presented: Option<&str>) -> Result<LogoutOutcome, SessionError> {
        let Some(token) = presented.filter(|t| !t.trim().is_empty()) else {
            return Ok(LogoutOutcome::AlreadyLoggedOut);
        };

        match self.tokens.verify_refresh_token(token) {
            Ok(username) => {
                self.end_session(&username).await?;
                info!(username = %username, "logged out");
                Ok(LogoutOutcome::Ended { username })
            }
            Err(e) => {
                debug!(error = %e, "logout with unusable refresh token");
                Ok(LogoutOutcome::AlreadyLoggedOut)
            }
        }
    }

    /// Drop the stored session for `username`, if any.
    pub async fn end_session(&self, username: &str) -> Result<(), SessionError> {
        self.sessions.delete(username).await?;
        Ok(())
    }
}
