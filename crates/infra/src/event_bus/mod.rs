//! Outbound account events.
//!
//! The bus abstraction lives in `warden-events`. This module adds the sink the
//! account service emits through, plus infrastructure-backed buses (Redis).

use tracing::{debug, warn};

use warden_events::{AccountEvent, EventBus, EventEnvelope};

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisBusError, RedisPubSubEventBus};

/// Where account events go once the triggering change is committed.
///
/// `emit` never fails from the caller's point of view: delivery problems are
/// logged and dropped.
pub trait AccountEventSink: Send + Sync + 'static {
    fn emit(&self, event: AccountEvent);
}

/// Sink that wraps events in an envelope and publishes them on a bus.
#[derive(Debug, Clone)]
pub struct BusEventSink<B> {
    bus: B,
}

impl<B> BusEventSink<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B> AccountEventSink for BusEventSink<B>
where
    B: EventBus<EventEnvelope<AccountEvent>> + 'static,
{
    fn emit(&self, event: AccountEvent) {
        let envelope = event.into_envelope();
        let event_id = envelope.event_id();
        let event_type = envelope.event_type().to_string();

        match self.bus.publish(envelope) {
            Ok(()) => debug!(%event_id, event_type, "account event published"),
            Err(e) => warn!(%event_id, event_type, error = ?e, "failed to publish account event"),
        }
    }
}
