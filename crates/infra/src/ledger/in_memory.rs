use std::collections::HashSet;
use std::sync::RwLock;

use dockyard_core::{AggregateId, TenantId};
use dockyard_inventory::{InventoryMovement, MovementId};

use super::query::{MovementPage, PageRequest};
use super::{LedgerError, MovementLedger};

#[derive(Debug, Default)]
struct Inner {
    movements: Vec<InventoryMovement>,
    ids: HashSet<MovementId>,
}

/// In-memory append-only ledger.
///
/// Intended for tests/dev. Scans are linear in the total number of movements.
#[derive(Debug, Default)]
pub struct InMemoryMovementLedger {
    inner: RwLock<Inner>,
}

impl InMemoryMovementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of movements held for a tenant.
    pub fn len(&self, tenant_id: TenantId) -> usize {
        self.inner
            .read()
            .map(|i| i.movements.iter().filter(|m| m.tenant_id == tenant_id).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, tenant_id: TenantId) -> bool {
        self.len(tenant_id) == 0
    }
}

impl MovementLedger for InMemoryMovementLedger {
    fn append(&self, movement: InventoryMovement) -> Result<(), LedgerError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::Backend("lock poisoned".to_string()))?;

        if !inner.ids.insert(movement.id) {
            return Err(LedgerError::Duplicate(movement.id));
        }
        inner.movements.push(movement);
        Ok(())
    }

    fn query_by_ref(
        &self,
        tenant_id: TenantId,
        ref_id: AggregateId,
        page: PageRequest,
    ) -> Result<MovementPage, LedgerError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerError::Backend("lock poisoned".to_string()))?;

        let mut matching = inner
            .movements
            .iter()
            .filter(|m| m.tenant_id == tenant_id && m.ref_id == ref_id)
            .skip(page.offset as usize);

        let movements: Vec<InventoryMovement> =
            matching.by_ref().take(page.limit as usize).cloned().collect();
        let has_more = matching.next().is_some();

        let next = has_more.then(|| page.next(movements.len()));
        Ok(MovementPage { movements, next })
    }
}
