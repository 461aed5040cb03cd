//! Domain events and their distribution.
//!
//! Events here are notifications: they are published after state has been
//! committed and losing one never changes stored quantities.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
