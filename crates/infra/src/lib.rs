//! Infrastructure layer: session storage, account persistence, event
//! publication and the services that orchestrate them.

pub mod account_service;
pub mod accounts;
pub mod event_bus;
mod password;
pub mod session;
pub mod session_store;

pub use account_service::{AccountChanges, AccountError, AccountService, Registration};
pub use accounts::{
    Account, AccountRepository, InMemoryAccountRepository, NewAccount, PostgresAccountRepository, RepositoryError,
};
pub use event_bus::{AccountEventSink, BusEventSink};
pub use session::{LoginOutcome, LogoutOutcome, SessionError, SessionManager};
pub use session_store::{InMemorySessionStore, SessionStore, SessionStoreError};
