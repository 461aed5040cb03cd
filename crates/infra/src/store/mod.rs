//! Document stores consumed by receiving: orders, backorders, parties.
//!
//! The store is assumed to support only per-document writes. Receiving never
//! relies on a transaction spanning two documents.

pub mod tenant_store;

use std::sync::Arc;

use thiserror::Error;

use dockyard_core::TenantId;
use dockyard_parties::{Party, PartyId};
use dockyard_purchasing::{PurchaseOrder, PurchaseOrderId, ReceiptPatch};
use dockyard_sales::{BackorderRequest, BackorderRequestId};

pub use tenant_store::{InMemoryTenantStore, TenantStore};

/// Document store failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("document not found: {0}")]
    Missing(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Backend("lock poisoned".to_string())
    }
}

/// Purchase order persistence.
pub trait OrderStore: Send + Sync {
    fn load(&self, tenant_id: TenantId, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError>;

    /// Apply a receipt patch and return the stored document.
    fn save(
        &self,
        tenant_id: TenantId,
        id: PurchaseOrderId,
        patch: &ReceiptPatch,
    ) -> Result<PurchaseOrder, StoreError>;
}

/// Backorder request persistence.
pub trait BackorderStore: Send + Sync {
    fn load(
        &self,
        tenant_id: TenantId,
        id: BackorderRequestId,
    ) -> Result<Option<BackorderRequest>, StoreError>;

    fn save(&self, tenant_id: TenantId, backorder: &BackorderRequest) -> Result<(), StoreError>;
}

/// Read access to trading parties.
pub trait PartyDirectory: Send + Sync {
    fn load(&self, tenant_id: TenantId, id: PartyId) -> Result<Option<Party>, StoreError>;
}

pub type InMemoryOrderStore = InMemoryTenantStore<PurchaseOrderId, PurchaseOrder>;
pub type InMemoryBackorderStore = InMemoryTenantStore<BackorderRequestId, BackorderRequest>;
pub type InMemoryPartyDirectory = InMemoryTenantStore<PartyId, Party>;

impl OrderStore for InMemoryOrderStore {
    fn load(&self, tenant_id: TenantId, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError> {
        let order = self.get(tenant_id, &id)?;
        if let Some(o) = &order {
            if o.tenant_id != tenant_id {
                return Err(StoreError::TenantIsolation(format!("order {id} owned by another tenant")));
            }
        }
        Ok(order)
    }

    fn save(
        &self,
        tenant_id: TenantId,
        id: PurchaseOrderId,
        patch: &ReceiptPatch,
    ) -> Result<PurchaseOrder, StoreError> {
        let mut order = self
            .get(tenant_id, &id)?
            .ok_or_else(|| StoreError::Missing(format!("purchase order {id}")))?;
        order.apply_patch(patch);
        self.upsert(tenant_id, id, order.clone())?;
        Ok(order)
    }
}

impl BackorderStore for InMemoryBackorderStore {
    fn load(
        &self,
        tenant_id: TenantId,
        id: BackorderRequestId,
    ) -> Result<Option<BackorderRequest>, StoreError> {
        self.get(tenant_id, &id)
    }

    fn save(&self, tenant_id: TenantId, backorder: &BackorderRequest) -> Result<(), StoreError> {
        if backorder.tenant_id != tenant_id {
            return Err(StoreError::TenantIsolation(format!(
                "backorder {} owned by another tenant",
                backorder.id
            )));
        }
        self.upsert(tenant_id, backorder.id, backorder.clone())
    }
}

impl PartyDirectory for InMemoryPartyDirectory {
    fn load(&self, tenant_id: TenantId, id: PartyId) -> Result<Option<Party>, StoreError> {
        self.get(tenant_id, &id)
    }
}

impl<S: OrderStore + ?Sized> OrderStore for Arc<S> {
    fn load(&self, tenant_id: TenantId, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError> {
        (**self).load(tenant_id, id)
    }

    fn save(
        &self,
        tenant_id: TenantId,
        id: PurchaseOrderId,
        patch: &ReceiptPatch,
    ) -> Result<PurchaseOrder, StoreError> {
        (**self).save(tenant_id, id, patch)
    }
}

impl<S: BackorderStore + ?Sized> BackorderStore for Arc<S> {
    fn load(
        &self,
        tenant_id: TenantId,
        id: BackorderRequestId,
    ) -> Result<Option<BackorderRequest>, StoreError> {
        (**self).load(tenant_id, id)
    }

    fn save(&self, tenant_id: TenantId, backorder: &BackorderRequest) -> Result<(), StoreError> {
        (**self).save(tenant_id, backorder)
    }
}

impl<S: PartyDirectory + ?Sized> PartyDirectory for Arc<S> {
    fn load(&self, tenant_id: TenantId, id: PartyId) -> Result<Option<Party>, StoreError> {
        (**self).load(tenant_id, id)
    }
}
