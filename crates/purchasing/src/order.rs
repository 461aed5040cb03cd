use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dockyard_core::{DomainError, Entity, TenantId};
use dockyard_inventory::InventoryItemId;
use dockyard_parties::PartyId;
use dockyard_sales::BackorderRequestId;

use crate::receipt::LineRef;

dockyard_core::typed_id!(
    /// Purchase order identifier (tenant-scoped).
    PurchaseOrderId
);

dockyard_core::typed_id!(
    /// Stable purchase order line identifier.
    OrderLineId
);

/// Purchase order status lifecycle.
///
/// Receiving only moves an order between `approved`, `partially-received` and
/// `fulfilled`; the other transitions belong to the wider order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Draft,
    Submitted,
    Approved,
    PartiallyReceived,
    Fulfilled,
    Cancelled,
    Closed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Approved => "approved",
            OrderStatus::PartiallyReceived => "partially-received",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Closed => "closed",
        }
    }

    /// Whether goods may be received against an order in this status.
    pub fn is_receivable(&self) -> bool {
        matches!(self, OrderStatus::Approved | OrderStatus::PartiallyReceived)
    }

    /// Whether a receipt request gets past the status gate.
    ///
    /// `fulfilled` is admitted so the line check reports the over-receive with
    /// its shortfall; every positive delta against it is then rejected.
    pub fn admits_receipt(&self) -> bool {
        self.is_receivable() || *self == OrderStatus::Fulfilled
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    /// Alternate reference from older clients (e.g. an imported line number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_ref: Option<String>,
    pub item_id: InventoryItemId,
    pub ordered_qty: i64,
    /// Mirror of the ledger total for this line; rewritten on every receipt.
    pub received_qty: i64,
    #[serde(default)]
    pub backorder_request_ids: Vec<BackorderRequestId>,
}

impl OrderLine {
    pub fn new(item_id: InventoryItemId, ordered_qty: i64) -> Result<Self, DomainError> {
        if ordered_qty <= 0 {
            return Err(DomainError::validation("ordered quantity must be positive"));
        }

        Ok(Self {
            id: OrderLineId::generate(),
            legacy_ref: None,
            item_id,
            ordered_qty,
            received_qty: 0,
            backorder_request_ids: Vec::new(),
        })
    }

    pub fn with_legacy_ref(mut self, legacy_ref: impl Into<String>) -> Self {
        self.legacy_ref = Some(legacy_ref.into());
        self
    }

    pub fn with_backorders(mut self, ids: Vec<BackorderRequestId>) -> Self {
        self.backorder_request_ids = ids;
        self
    }

    /// Whether `line_ref` names this line, by stable id or legacy reference.
    pub fn matches(&self, line_ref: &LineRef) -> bool {
        let raw = line_ref.as_str();
        if raw.parse::<OrderLineId>().is_ok_and(|id| id == self.id) {
            return true;
        }
        self.legacy_ref.as_deref() == Some(raw)
    }
}

/// Changes written back to an order after a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPatch {
    pub status: OrderStatus,
    /// New ledger-derived received totals, per line.
    pub received: Vec<(OrderLineId, i64)>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase order document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub tenant_id: TenantId,
    pub status: OrderStatus,
    pub vendor_id: Option<PartyId>,
    pub lines: Vec<OrderLine>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn new(
        tenant_id: TenantId,
        id: PurchaseOrderId,
        vendor_id: Option<PartyId>,
        lines: Vec<OrderLine>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            status: OrderStatus::Draft,
            vendor_id,
            lines,
            updated_at: created_at,
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Reject receiving for `draft`, `submitted`, `cancelled` and `closed` orders.
    pub fn ensure_receivable(&self) -> Result<(), DomainError> {
        if self.status.admits_receipt() {
            return Ok(());
        }
        Err(DomainError::conflict(format!(
            "cannot receive goods while purchase order is {}",
            self.status
        )))
    }

    pub fn find_line(&self, line_ref: &LineRef) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.matches(line_ref))
    }

    pub fn line(&self, id: OrderLineId) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Status after a receipt, given each line's total received quantity.
    ///
    /// Only `fulfilled` or `partially-received` can come out of this, even when
    /// no line changed.
    pub fn status_after_receipt(&self, received: impl Fn(OrderLineId) -> i64) -> OrderStatus {
        if self.lines.iter().all(|l| received(l.id) >= l.ordered_qty) {
            OrderStatus::Fulfilled
        } else {
            OrderStatus::PartiallyReceived
        }
    }

    pub fn apply_patch(&mut self, patch: &ReceiptPatch) {
        self.status = patch.status;
        for (line_id, received) in &patch.received {
            if let Some(line) = self.lines.iter_mut().find(|l| l.id == *line_id) {
                line.received_qty = *received;
            }
        }
        self.updated_at = patch.updated_at;
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
