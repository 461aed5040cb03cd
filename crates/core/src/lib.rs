//! `dockyard-core`: shared domain primitives.
//!
//! Identifiers, the entity trait and the domain error model. No IO lives here.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::DomainError;
pub use id::{AggregateId, TenantId};
