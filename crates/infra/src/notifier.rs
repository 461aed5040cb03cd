//! Outbound notifications for committed receipts.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use dockyard_events::{EventBus, EventEnvelope};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    #[error("notification payload could not be serialized: {0}")]
    Serialization(String),
}

/// What a provider reported for one emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmitReceipt {
    pub emitted: bool,
    pub provider: String,
}

/// Fire-and-forget event sink. Callers never make correctness depend on it.
pub trait EventNotifier: Send + Sync {
    fn emit(&self, envelope: EventEnvelope) -> Result<EmitReceipt, NotifyError>;
}

impl<N> EventNotifier for Arc<N>
where
    N: EventNotifier + ?Sized,
{
    fn emit(&self, envelope: EventEnvelope) -> Result<EmitReceipt, NotifyError> {
        (**self).emit(envelope)
    }
}

/// Publishes envelopes on an [`EventBus`].
#[derive(Debug)]
pub struct BusNotifier<B> {
    bus: B,
}

impl<B> BusNotifier<B> {
    pub const PROVIDER: &'static str = "bus";

    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B> EventNotifier for BusNotifier<B>
where
    B: EventBus<EventEnvelope>,
{
    fn emit(&self, envelope: EventEnvelope) -> Result<EmitReceipt, NotifyError> {
        self.bus.publish(envelope).map_err(|e| NotifyError::Provider {
            provider: Self::PROVIDER.to_string(),
            message: format!("{e:?}"),
        })?;

        Ok(EmitReceipt {
            emitted: true,
            provider: Self::PROVIDER.to_string(),
        })
    }
}

/// Drops every event. Used when no notification channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl EventNotifier for NoopNotifier {
    fn emit(&self, _envelope: EventEnvelope) -> Result<EmitReceipt, NotifyError> {
        Ok(EmitReceipt {
            emitted: false,
            provider: "noop".to_string(),
        })
    }
}
