//! Trading parties (vendors, customers).
//!
//! Receiving only needs to know whether the party an order points at is
//! tagged as a vendor and allowed to transact.

pub mod party;

pub use party::{Party, PartyId, PartyRole, PartyStatus};
