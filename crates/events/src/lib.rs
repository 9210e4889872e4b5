//! Integration events announced to other services, and the bus that carries them.

pub mod account;
pub mod bus;
pub mod envelope;
pub mod in_memory_bus;

pub use account::AccountEvent;
pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
