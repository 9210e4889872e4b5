//! Composition root: assembles stores, codec and services once at startup.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use warden_auth::{PasswordHasher, TokenCodec};
use warden_events::{AccountEvent, EventEnvelope, InMemoryEventBus};
use warden_infra::{
    AccountEventSink, AccountRepository, AccountService, BusEventSink, InMemoryAccountRepository,
    InMemorySessionStore, PostgresAccountRepository, RepositoryError, SessionManager, SessionStore,
    SessionStoreError,
};

#[cfg(feature = "redis")]
use warden_infra::event_bus::{RedisBusError, RedisPubSubEventBus};
#[cfg(feature = "redis")]
use warden_infra::session_store::RedisSessionStore;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("session store: {0}")]
    Sessions(#[from] SessionStoreError),

    #[error("account repository: {0}")]
    Accounts(#[from] RepositoryError),

    #[cfg(feature = "redis")]
    #[error("account events: {0}")]
    Events(#[from] RedisBusError),
}

pub struct AppServices {
    pub tokens: Arc<TokenCodec>,
    pub sessions: SessionManager,
    pub accounts: AccountService,
}

impl AppServices {
    /// Wire services over the given backends.
    pub fn new(
        jwt_secret: &str,
        hasher: PasswordHasher,
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountRepository>,
        events: Arc<dyn AccountEventSink>,
    ) -> Self {
        let tokens = Arc::new(TokenCodec::new(jwt_secret));
        Self {
            sessions: SessionManager::new(tokens.clone(), sessions.clone(), accounts.clone(), hasher),
            accounts: AccountService::new(accounts, sessions, events, hasher),
            tokens,
        }
    }

    /// Everything in process memory (dev/test).
    pub fn in_memory(jwt_secret: &str, hasher: PasswordHasher) -> Self {
        Self::new(
            jwt_secret,
            hasher,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(in_memory_sink()),
        )
    }
}

fn in_memory_sink() -> BusEventSink<InMemoryEventBus<EventEnvelope<AccountEvent>>> {
    BusEventSink::new(InMemoryEventBus::new())
}

/// Pick backends from configuration: Postgres when `DATABASE_URL` is set,
/// Redis when `REDIS_URL` is set, in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServiceError> {
    let hasher = PasswordHasher::new(config.bcrypt_cost);

    let accounts: Arc<dyn AccountRepository> = match &config.database_url {
        Some(url) => {
            info!("using postgres account repository");
            Arc::new(PostgresAccountRepository::connect(url).await?)
        }
        None => {
            info!("DATABASE_URL not set; using in-memory account repository");
            Arc::new(InMemoryAccountRepository::new())
        }
    };

    let (sessions, events) = session_and_event_backends(config).await?;

    Ok(AppServices::new(&config.jwt_secret, hasher, sessions, accounts, events))
}

#[cfg(feature = "redis")]
async fn session_and_event_backends(
    config: &AppConfig,
) -> Result<(Arc<dyn SessionStore>, Arc<dyn AccountEventSink>), ServiceError> {
    match &config.redis_url {
        Some(url) => {
            info!(channel = %config.account_events_channel, "using redis session store and event channel");
            let sessions = RedisSessionStore::connect(url, config.session_store_timeout).await?;
            let bus = RedisPubSubEventBus::new(url, config.account_events_channel.clone())?;
            Ok((Arc::new(sessions), Arc::new(BusEventSink::new(bus))))
        }
        None => {
            info!("REDIS_URL not set; using in-memory session store and event bus");
            Ok((Arc::new(InMemorySessionStore::new()), Arc::new(in_memory_sink())))
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn session_and_event_backends(
    config: &AppConfig,
) -> Result<(Arc<dyn SessionStore>, Arc<dyn AccountEventSink>), ServiceError> {
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL set but redis feature not enabled, falling back to in-memory");
    }
    Ok((Arc::new(InMemorySessionStore::new()), Arc::new(in_memory_sink())))
}
