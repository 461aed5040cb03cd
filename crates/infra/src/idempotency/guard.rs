use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use dockyard_core::TenantId;
use dockyard_purchasing::{ContentSignature, IdempotencyKey, PurchaseOrder, PurchaseOrderId};

use super::{IdempotencyKind, IdempotencyRecord, IdempotencyStore, IdempotencyStoreError};

/// Two-axis at-most-once gate for receipts against one order.
///
/// `check_key` runs before validation, `check_signature` after it; both return
/// the order snapshot recorded by [`IdempotencyGuard::mark_applied`].
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn IdempotencyStore>,
    scope: String,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn IdempotencyStore>, scope: impl Into<String>) -> Self {
        Self {
            store,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn check_key(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        key: &IdempotencyKey,
    ) -> Result<Option<PurchaseOrder>, IdempotencyStoreError> {
        self.lookup(tenant_id, order_id, IdempotencyKind::ExplicitKey, key.as_str())
    }

    pub fn check_signature(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        signature: &ContentSignature,
    ) -> Result<Option<PurchaseOrder>, IdempotencyStoreError> {
        self.lookup(tenant_id, order_id, IdempotencyKind::ContentSignature, signature.as_str())
    }

    /// Record both axes with `response` as the replay payload.
    ///
    /// Existing records are kept: the first application's response stays the
    /// one served to retries.
    pub fn mark_applied(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        key: Option<&IdempotencyKey>,
        signature: &ContentSignature,
        response: &PurchaseOrder,
    ) -> Result<(), IdempotencyStoreError> {
        let snapshot = serde_json::to_value(response)?;

        if let Some(key) = key {
            self.record(tenant_id, order_id, IdempotencyKind::ExplicitKey, key.as_str(), &snapshot)?;
        }
        self.record(tenant_id, order_id, IdempotencyKind::ContentSignature, signature.as_str(), &snapshot)?;
        Ok(())
    }

    /// Bind `key` to a response that was served from the signature record.
    ///
    /// Afterwards the key replays that response whatever body it arrives
    /// with. Returns `false` when the key was already bound.
    pub fn remember_key(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        key: &IdempotencyKey,
        response: &PurchaseOrder,
    ) -> Result<bool, IdempotencyStoreError> {
        let snapshot = serde_json::to_value(response)?;
        self.record(tenant_id, order_id, IdempotencyKind::ExplicitKey, key.as_str(), &snapshot)
    }

    fn record(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        kind: IdempotencyKind,
        value: &str,
        snapshot: &serde_json::Value,
    ) -> Result<bool, IdempotencyStoreError> {
        let written = self.store.insert_if_absent(IdempotencyRecord {
            tenant_id,
            scope: self.scope.clone(),
            ref_id: order_id.0,
            kind,
            value: value.to_string(),
            response: snapshot.clone(),
            created_at: Utc::now(),
        })?;
        debug!(%tenant_id, %order_id, %kind, written, "idempotency marker");
        Ok(written)
    }

    fn lookup(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
        kind: IdempotencyKind,
        value: &str,
    ) -> Result<Option<PurchaseOrder>, IdempotencyStoreError> {
        let Some(record) = self.store.find(tenant_id, &self.scope, order_id.0, kind, value)? else {
            return Ok(None);
        };
        let order = serde_json::from_value(record.response)?;
        Ok(Some(order))
    }
}

impl core::fmt::Debug for IdempotencyGuard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdempotencyGuard").field("scope", &self.scope).finish()
    }
}
