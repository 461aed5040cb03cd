//! Durable at-most-once markers for receiving.
//!
//! A record is keyed by `(tenant, scope, ref_id, kind, value)` and carries a
//! snapshot of the response that the first application produced. Records are
//! only written after every side effect of a receipt has been applied.

pub mod guard;
pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use dockyard_core::{AggregateId, TenantId};

pub use guard::IdempotencyGuard;
pub use in_memory::InMemoryIdempotencyStore;
pub use postgres::PostgresIdempotencyStore;

/// Which dedup axis a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdempotencyKind {
    /// Caller-supplied retry key. Checked before validation.
    ExplicitKey,
    /// Hash of the normalized request. Checked after validation.
    ContentSignature,
}

impl IdempotencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdempotencyKind::ExplicitKey => "explicit-key",
            IdempotencyKind::ContentSignature => "content-signature",
        }
    }
}

impl core::str::FromStr for IdempotencyKind {
    type Err = IdempotencyStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicit-key" => Ok(IdempotencyKind::ExplicitKey),
            "content-signature" => Ok(IdempotencyKind::ContentSignature),
            other => Err(IdempotencyStoreError::Backend(format!("unknown idempotency kind '{other}'"))),
        }
    }
}

impl core::fmt::Display for IdempotencyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker that a logical request was applied, with the response it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub tenant_id: TenantId,
    pub scope: String,
    pub ref_id: AggregateId,
    pub kind: IdempotencyKind,
    pub value: String,
    pub response: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdempotencyStoreError {
    #[error("idempotency backend failure: {0}")]
    Backend(String),

    #[error("idempotency payload could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for IdempotencyStoreError {
    fn from(err: serde_json::Error) -> Self {
        IdempotencyStoreError::Serialization(err.to_string())
    }
}

/// Storage for idempotency records.
///
/// `insert_if_absent` must be atomic per record key: of two concurrent inserts
/// for the same key exactly one returns `true`.
pub trait IdempotencyStore: Send + Sync {
    fn find(
        &self,
        tenant_id: TenantId,
        scope: &str,
        ref_id: AggregateId,
        kind: IdempotencyKind,
        value: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError>;

    /// Write the record unless one exists. Returns whether it was written.
    fn insert_if_absent(&self, record: IdempotencyRecord) -> Result<bool, IdempotencyStoreError>;
}

impl<S> IdempotencyStore for Arc<S>
where
    S: IdempotencyStore + ?Sized,
{
    fn find(
        &self,
        tenant_id: TenantId,
        scope: &str,
        ref_id: AggregateId,
        kind: IdempotencyKind,
        value: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError> {
        (**self).find(tenant_id, scope, ref_id, kind, value)
    }

    fn insert_if_absent(&self, record: IdempotencyRecord) -> Result<bool, IdempotencyStoreError> {
        (**self).insert_if_absent(record)
    }
}
