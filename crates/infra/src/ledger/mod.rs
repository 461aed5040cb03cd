//! Append-only inventory movement ledger.
//!
//! The ledger is the source of truth for received quantities. Order line
//! counters are rewritten from [`sum_received_by_line`] on every receipt and
//! are never read back as an authority.

pub mod in_memory;
pub mod postgres;
pub mod query;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use dockyard_core::{AggregateId, TenantId};
use dockyard_inventory::{InventoryMovement, MovementId, ReceivedByLine};

pub use in_memory::InMemoryMovementLedger;
pub use postgres::PostgresMovementLedger;
pub use query::{MovementPage, PageRequest};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A movement with this id was already written.
    #[error("movement {0} already recorded")]
    Duplicate(MovementId),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("ledger backend failure: {0}")]
    Backend(String),
}

/// Write-once movement storage with a paginated scan by reference document.
pub trait MovementLedger: Send + Sync {
    /// Insert a movement. An existing id is never overwritten.
    fn append(&self, movement: InventoryMovement) -> Result<(), LedgerError>;

    /// Movements referencing `ref_id`, in append order.
    fn query_by_ref(
        &self,
        tenant_id: TenantId,
        ref_id: AggregateId,
        page: PageRequest,
    ) -> Result<MovementPage, LedgerError>;
}

impl<L> MovementLedger for Arc<L>
where
    L: MovementLedger + ?Sized,
{
    fn append(&self, movement: InventoryMovement) -> Result<(), LedgerError> {
        (**self).append(movement)
    }

    fn query_by_ref(
        &self,
        tenant_id: TenantId,
        ref_id: AggregateId,
        page: PageRequest,
    ) -> Result<MovementPage, LedgerError> {
        (**self).query_by_ref(tenant_id, ref_id, page)
    }
}

/// Received quantity per line of `order_id`, scanning every page.
///
/// O(n) in the order's movements. A line-keyed secondary index would make this
/// constant-time but is not required for correctness.
pub fn sum_received_by_line<L>(
    ledger: &L,
    tenant_id: TenantId,
    order_id: AggregateId,
    page_size: u32,
) -> Result<ReceivedByLine, LedgerError>
where
    L: MovementLedger + ?Sized,
{
    let mut totals = ReceivedByLine::new(order_id);
    let mut request = Some(PageRequest::first(page_size));
    let mut pages = 0u32;

    while let Some(page) = request {
        let result = ledger.query_by_ref(tenant_id, order_id, page)?;
        for m in &result.movements {
            // A misbehaving backend must not leak another tenant's receipts.
            if m.tenant_id != tenant_id {
                return Err(LedgerError::TenantIsolation(format!(
                    "movement {} belongs to another tenant",
                    m.id
                )));
            }
        }
        totals.record_all(&result.movements);
        pages += 1;

        if result.movements.is_empty() {
            break;
        }
        if let Some(next) = &result.next {
            if next.offset <= page.offset {
                return Err(LedgerError::Backend(format!(
                    "ledger page cursor did not advance past offset {}",
                    page.offset
                )));
            }
        }
        request = result.next;
    }

    debug!(%tenant_id, %order_id, pages, total = totals.total(), "aggregated received quantities");
    Ok(totals)
}
