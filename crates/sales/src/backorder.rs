use serde::{Deserialize, Serialize};

use dockyard_core::{DomainError, Entity, TenantId};
use dockyard_inventory::InventoryItemId;

dockyard_core::typed_id!(
    /// Backorder request identifier.
    BackorderRequestId
);

dockyard_core::typed_id!(
    /// Sales order identifier.
    SalesOrderId
);

dockyard_core::typed_id!(
    /// Sales order line identifier.
    SalesOrderLineId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackorderStatus {
    Open,
    Fulfilled,
    /// Dismissed by a planner; receipts no longer apply.
    Ignored,
    /// Turned into another document (e.g. a transfer); receipts no longer apply.
    Converted,
}

/// Outcome of applying one receipt delta to one backorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptEffect {
    /// Remaining demand reached zero.
    Fulfilled,
    /// Demand reduced but still outstanding.
    Reduced { remaining: i64 },
    /// Nothing changed because of the backorder's status.
    Unchanged(BackorderStatus),
}

/// Outstanding sales demand waiting on a purchase order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackorderRequest {
    pub id: BackorderRequestId,
    pub tenant_id: TenantId,
    pub so_id: SalesOrderId,
    pub so_line_id: SalesOrderLineId,
    pub item_id: InventoryItemId,
    pub qty: i64,
    /// Older records may not carry it; see [`BackorderRequest::remaining`].
    pub remaining_qty: Option<i64>,
    pub fulfilled_qty: i64,
    pub status: BackorderStatus,
}

impl BackorderRequest {
    pub fn open(
        tenant_id: TenantId,
        id: BackorderRequestId,
        so_id: SalesOrderId,
        so_line_id: SalesOrderLineId,
        item_id: InventoryItemId,
        qty: i64,
    ) -> Result<Self, DomainError> {
        if qty <= 0 {
            return Err(DomainError::validation("backorder quantity must be positive"));
        }

        Ok(Self {
            id,
            tenant_id,
            so_id,
            so_line_id,
            item_id,
            qty,
            remaining_qty: Some(qty),
            fulfilled_qty: 0,
            status: BackorderStatus::Open,
        })
    }

    /// Outstanding quantity: the stored value, else `qty - fulfilled_qty`
    /// floored at zero.
    pub fn remaining(&self) -> i64 {
        self.remaining_qty
            .unwrap_or_else(|| (self.qty - self.fulfilled_qty).max(0))
    }

    /// Draw the backorder down by a full receipt delta.
    ///
    /// The delta is not shared with sibling backorders on the same line; each
    /// linked backorder sees the whole quantity.
    pub fn apply_receipt(&mut self, delta: i64) -> ReceiptEffect {
        match self.status {
            BackorderStatus::Open => {}
            other => return ReceiptEffect::Unchanged(other),
        }

        let remaining = self.remaining() - delta;
        if remaining <= 0 {
            self.status = BackorderStatus::Fulfilled;
            self.fulfilled_qty = self.qty;
            self.remaining_qty = Some(0);
            ReceiptEffect::Fulfilled
        } else {
            self.remaining_qty = Some(remaining);
            self.fulfilled_qty = (self.qty - remaining).max(0);
            ReceiptEffect::Reduced { remaining }
        }
    }
}

impl Entity for BackorderRequest {
    type Id = BackorderRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
