//! Infrastructure layer: stores, ledger, idempotency, notification and the
//! receiving workflow that ties them together.

pub mod config;
pub mod idempotency;
pub mod ledger;
pub mod notifier;
pub mod pg;
pub mod receiving;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use config::ReceivingConfig;
pub use receiving::{ReceiveError, ReceiveErrorCode, ReceiveOutcome, ReceivingPorts, ReceivingWorkflow};
