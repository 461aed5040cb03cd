//! Goods receipt against purchase orders.
//!
//! [`ReceivingWorkflow::receive`] runs, in order: order load, key replay
//! check, status and vendor guards, line normalization, ledger aggregation,
//! the over-receive check, signature replay check, ledger append, backorder
//! cascade, status recompute and save, idempotency mark, event emission.

pub mod cascade;
pub mod error;
pub mod policy;
pub mod workflow;

pub use cascade::{BackorderCascade, CascadeReport};
pub use error::{ReceiveError, ReceiveErrorCode};
pub use policy::{FailurePolicy, SkippedStep, SubOperation};
pub use workflow::{ReceiveOutcome, ReceivingPorts, ReceivingWorkflow};
