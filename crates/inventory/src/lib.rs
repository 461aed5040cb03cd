//! Inventory movements (append-only ledger records).
//!
//! This crate defines the immutable movement record and the pure aggregation
//! that derives received quantities from it. Storage lives in `dockyard-infra`.

pub mod movement;
pub mod received;

pub use movement::{InventoryItemId, InventoryMovement, MovementAction, MovementId};
pub use received::ReceivedByLine;
