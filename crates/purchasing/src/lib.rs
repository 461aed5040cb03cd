//! Purchasing domain module: purchase orders and goods receipt rules.
//!
//! This crate contains the deterministic half of receiving (status gates,
//! line normalization, the over-receive invariant, the content signature and
//! the receiving events). No IO, no HTTP, no storage.

pub mod events;
pub mod order;
pub mod receipt;
pub mod signature;

pub use events::{LineReceived, OrderReceived, ReceivingEvent};
pub use order::{OrderLine, OrderLineId, OrderStatus, PurchaseOrder, PurchaseOrderId, ReceiptPatch};
pub use receipt::{
    IdempotencyKey, LinePlan, LineRef, NormalizedLine, ReceiptLine, ReceiptRejection, ReceiveGoods,
    ReceiveShortfall, normalize_lines, plan_receipt,
};
pub use signature::ContentSignature;
