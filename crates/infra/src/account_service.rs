//! Account self-service and administration.
//!
//! Field rules come from `warden_auth::rules`; uniqueness is checked here
//! against the repository (and enforced again by the repository itself).
//! Deleting an account drops its session and announces the deletion through
//! the account event sink without waiting for delivery.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use warden_auth::{AuthzError, Identity, PasswordError, PasswordHasher, Role, authorize_owner, rules};
use warden_core::{DomainError, UserId, Violations};
use warden_events::AccountEvent;

use crate::accounts::{Account, AccountRepository, NewAccount, RepositoryError};
use crate::event_bus::AccountEventSink;
use crate::password::hash_password;
use crate::session_store::{SessionStore, SessionStoreError};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Repository(RepositoryError),

    #[error(transparent)]
    Session(#[from] SessionStoreError),
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { field } => {
                AccountError::Domain(Violations::single(field, taken_message(field)).into())
            }
            RepositoryError::Missing(id) => AccountError::Domain(missing(id)),
            other => AccountError::Repository(other),
        }
    }
}

impl From<Violations> for AccountError {
    fn from(v: Violations) -> Self {
        AccountError::Domain(DomainError::Validation(v))
    }
}

impl From<AuthzError> for AccountError {
    fn from(_: AuthzError) -> Self {
        AccountError::Domain(DomainError::AccessDenied)
    }
}

fn taken_message(field: &str) -> String {
    format!("This {field} is already taken!")
}

fn missing(id: UserId) -> DomainError {
    DomainError::not_found(format!("User with ID {id} wasn't found!"))
}

/// Input of `register`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    sessions: Arc<dyn SessionStore>,
    events: Arc<dyn AccountEventSink>,
    hasher: PasswordHasher,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        sessions: Arc<dyn SessionStore>,
        events: Arc<dyn AccountEventSink>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            accounts,
            sessions,
            events,
            hasher,
        }
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: Registration) -> Result<Account, AccountError> {
        let mut violations = Violations::new();
        rules::check_username(&input.username, &mut violations);
        rules::check_password(&input.password, &mut violations);
        rules::check_email(&input.email, &mut violations);
        self.check_unique(Some(&input.username), Some(&input.email), None, &mut violations)
            .await?;
        violations.into_result()?;

        let password_hash = hash_password(self.hasher, input.password).await?;
        let account = self
            .accounts
            .insert(NewAccount {
                username: input.username,
                password_hash,
                email: input.email,
                role: Role::User,
            })
            .await?;

        info!(user_id = %account.id, "account registered");
        Ok(account)
    }

    pub async fn profile(&self, id: UserId) -> Result<Account, AccountError> {
        self.accounts
            .find_by_id(id)
            .await?
            .ok_or_else(|| missing(id).into())
    }

    #[instrument(skip(self, changes), fields(user_id = %id))]
    pub async fn update(&self, id: UserId, changes: AccountChanges) -> Result<Account, AccountError> {
        let mut account = self.profile(id).await?;

        let mut violations = Violations::new();
        if let Some(username) = &changes.username {
            rules::check_username(username, &mut violations);
        }
        if let Some(password) = &changes.password {
            rules::check_password(password, &mut violations);
        }
        if let Some(email) = &changes.email {
            rules::check_email(email, &mut violations);
        }
        self.check_unique(changes.username.as_deref(), changes.email.as_deref(), Some(id), &mut violations)
            .await?;
        violations.into_result()?;

        let previous_username = account.username.clone();
        if let Some(username) = changes.username {
            account.username = username;
        }
        if let Some(email) = changes.email {
            account.email = email;
        }
        if let Some(password) = changes.password {
            account.password_hash = hash_password(self.hasher, password).await?;
        }

        let updated = self.accounts.update(&account).await?;
        // Sessions are keyed by username; the old name's session ends with the rename.
        if updated.username != previous_username {
            self.sessions.delete(&previous_username).await?;
            info!(previous = %previous_username, "username changed; session ended");
        }
        info!("account updated");
        Ok(updated)
    }

    /// Remove `target`, end its session and announce the deletion.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id(), target = %target))]
    pub async fn delete(&self, actor: &Identity, target: UserId) -> Result<Account, AccountError> {
        authorize_owner(actor, target)?;

        let account = self.profile(target).await?;
        if !self.accounts.delete(target).await? {
            return Err(missing(target).into());
        }
        self.sessions.delete(&account.username).await?;

        let events = self.events.clone();
        let event = AccountEvent::Deleted { user_id: target };
        tokio::task::spawn_blocking(move || events.emit(event));

        info!("account deleted");
        Ok(account)
    }

    /// Grant ADMIN to `id` when `code` is acceptable, then end its session.
    #[instrument(skip(self, code), fields(user_id = %id))]
    pub async fn promote(&self, id: UserId, code: &str) -> Result<Account, AccountError> {
        rules::check_promotion_code(code)?;

        let mut account = self
            .accounts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User with this id {id} can't be found")))?;

        account.role = Role::Admin;
        let promoted = self.accounts.update(&account).await?;
        self.sessions.delete(&promoted.username).await?;

        info!("account promoted to admin");
        Ok(promoted)
    }

    pub async fn list(&self) -> Result<Vec<Account>, AccountError> {
        Ok(self.accounts.list().await?)
    }

    async fn check_unique(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        own_id: Option<UserId>,
        violations: &mut Violations,
    ) -> Result<(), AccountError> {
        let taken_by_other = |found: Option<Account>| found.is_some_and(|a| Some(a.id) != own_id);

        if let Some(username) = username.filter(|u| !u.is_empty()) {
            if taken_by_other(self.accounts.find_by_username(username).await?) {
                violations.push("username", taken_message("username"));
            }
        }
        if let Some(email) = email.filter(|e| !e.is_empty()) {
            if taken_by_other(self.accounts.find_by_email(email).await?) {
                violations.push("email", taken_message("email"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use warden_auth::TokenCodec;

    use super::*;
    use crate::accounts::InMemoryAccountRepository;
    use crate::session::{SessionError, SessionManager};
    use crate::session_store::InMemorySessionStore;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<AccountEvent>>,
    }

    impl AccountEventSink for RecordingSink {
        fn emit(&self, event: AccountEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Fixture {
        service: AccountService,
        accounts: Arc<InMemoryAccountRepository>,
        sessions: Arc<InMemorySessionStore>,
        sink: Arc<RecordingSink>,
    }

    fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let sink = Arc::new(RecordingSink::default());
        let service = AccountService::new(accounts.clone(), sessions.clone(), sink.clone(), PasswordHasher::new(4));
        Fixture {
            service,
            accounts,
            sessions,
            sink,
        }
    }

    impl Fixture {
        fn session_manager(&self) -> SessionManager {
            SessionManager::new(
                Arc::new(TokenCodec::new("account-test-secret")),
                self.sessions.clone(),
                self.accounts.clone(),
                PasswordHasher::new(4),
            )
        }
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            password: "Password1".to_string(),
            email: email.to_string(),
        }
    }

    fn validation_message(err: AccountError) -> String {
        match err {
            AccountError::Domain(DomainError::Validation(v)) => v.to_string(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    async fn wait_for_events(sink: &RecordingSink, n: usize) -> Vec<AccountEvent> {
        for _ in 0..100 {
            let events = sink.events.lock().unwrap().clone();
            if events.len() >= n {
                return events;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        sink.events.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn register_hashes_password_and_defaults_to_user_role() {
        let f = fixture();
        let account = f
            .service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap();

        assert_eq!(account.role, Role::User);
        assert_ne!(account.password_hash, "Password1");
        assert!(PasswordHasher::new(4).verify("Password1", &account.password_hash));
    }

    #[tokio::test]
    async fn register_aggregates_every_violation() {
        let f = fixture();
        f.service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap();

        let err = f
            .service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap_err();
        assert_eq!(
            validation_message(err),
            "username: This username is already taken!; email: This email is already taken!"
        );

        let err = f
            .service
            .register(Registration {
                username: "x".to_string(),
                password: "short".to_string(),
                email: "nope".to_string(),
            })
            .await
            .unwrap_err();
        let message = validation_message(err);
        assert!(message.contains("username: Username must be between 2 and 100 characters long"));
        assert!(message.contains("password: Password must be between 8 and 30 characters long"));
        assert!(message.contains("email: Email should be valid"));
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let f = fixture();
        let john = f
            .service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                john.id,
                AccountChanges {
                    email: Some("john.doe@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username, "john");
        assert_eq!(updated.email, "john.doe@example.com");
        assert_eq!(updated.password_hash, john.password_hash);
        assert_eq!(updated.role, Role::User);
    }

    #[tokio::test]
    async fn update_may_keep_own_username_but_not_take_anothers() {
        let f = fixture();
        let john = f
            .service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap();
        f.service
            .register(registration("maria123", "maria@example.com"))
            .await
            .unwrap();

        let same = AccountChanges {
            username: Some("john".to_string()),
            ..Default::default()
        };
        assert!(f.service.update(john.id, same).await.is_ok());

        let taken = AccountChanges {
            username: Some("maria123".to_string()),
            ..Default::default()
        };
        assert_eq!(
            validation_message(f.service.update(john.id, taken).await.unwrap_err()),
            "username: This username is already taken!"
        );
    }

    #[tokio::test]
    async fn rename_ends_session_so_freed_username_cannot_be_taken_over() {
        let f = fixture();
        let sessions = f.session_manager();
        let john = f
            .service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap();
        let login = sessions.login("john", "Password1").await.unwrap();

        let renamed = AccountChanges {
            username: Some("johnny".to_string()),
            ..Default::default()
        };
        f.service.update(john.id, renamed).await.unwrap();
        assert!(f.sessions.get("john").await.unwrap().is_none());

        let newcomer = f
            .service
            .register(registration("john", "newjohn@example.com"))
            .await
            .unwrap();
        assert_ne!(newcomer.id, john.id);

        assert!(matches!(
            sessions.refresh(&login.refresh_token).await,
            Err(SessionError::Revoked)
        ));
    }

    #[tokio::test]
    async fn update_without_rename_keeps_session() {
        let f = fixture();
        let sessions = f.session_manager();
        let john = f
            .service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap();
        let login = sessions.login("john", "Password1").await.unwrap();

        let changes = AccountChanges {
            username: Some("john".to_string()),
            password: Some("Password2".to_string()),
            ..Default::default()
        };
        f.service.update(john.id, changes).await.unwrap();

        assert!(sessions.refresh(&login.refresh_token).await.is_ok());
        assert!(sessions.login("john", "Password2").await.is_ok());
    }

    #[tokio::test]
    async fn delete_requires_ownership_or_admin() {
        let f = fixture();
        let john = f
            .service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap();
        let maria = f
            .service
            .register(registration("maria123", "maria@example.com"))
            .await
            .unwrap();

        let as_maria = Identity::new(maria.id, "maria123", Role::User);
        assert!(matches!(
            f.service.delete(&as_maria, john.id).await,
            Err(AccountError::Domain(DomainError::AccessDenied))
        ));

        let admin = Identity::new(UserId::new(99), "root", Role::Admin);
        assert!(f.service.delete(&admin, john.id).await.is_ok());
        assert!(matches!(
            f.service.delete(&admin, john.id).await,
            Err(AccountError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn delete_drops_session_and_announces_deletion() {
        let f = fixture();
        let john = f
            .service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap();
        f.sessions.put("john", "refresh-token").await.unwrap();

        let me = Identity::new(john.id, "john", Role::User);
        f.service.delete(&me, john.id).await.unwrap();

        assert!(f.sessions.get("john").await.unwrap().is_none());
        assert_eq!(
            wait_for_events(&f.sink, 1).await,
            vec![AccountEvent::Deleted { user_id: john.id }]
        );
    }

    #[tokio::test]
    async fn promote_checks_code_then_ends_session() {
        let f = fixture();
        let john = f
            .service
            .register(registration("john", "john@example.com"))
            .await
            .unwrap();
        f.sessions.put("john", "refresh-token").await.unwrap();

        let err = f.service.promote(john.id, "400001").await.unwrap_err();
        assert_eq!(
            validation_message(err),
            "code: Code must be a six-digit number divisible by 4"
        );
        assert!(f.sessions.get("john").await.unwrap().is_some());

        let promoted = f.service.promote(john.id, "400000").await.unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert!(f.sessions.get("john").await.unwrap().is_none());

        assert!(matches!(
            f.service.promote(UserId::new(404), "400000").await,
            Err(AccountError::Domain(DomainError::NotFound(_)))
        ));
    }
}
