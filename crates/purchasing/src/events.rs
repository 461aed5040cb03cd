//! Receiving notifications.
//!
//! Emitted after a receipt is committed. Consumers (notifications, projections)
//! must not rely on delivery for correctness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dockyard_core::TenantId;
use dockyard_events::Event;
use dockyard_inventory::InventoryItemId;

use crate::order::{OrderLineId, OrderStatus, PurchaseOrder, PurchaseOrderId};
use crate::receipt::LinePlan;

/// Event: OrderReceived (one per applied receipt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceived {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub status: OrderStatus,
    pub line_count: usize,
    pub total_delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineReceived (one per line with a positive delta).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineReceived {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line_id: OrderLineId,
    pub item_id: InventoryItemId,
    pub delta_qty: i64,
    pub received_qty: i64,
    pub ordered_qty: i64,
    pub lot: Option<String>,
    pub location_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceivingEvent {
    OrderReceived(OrderReceived),
    LineReceived(LineReceived),
}

impl ReceivingEvent {
    /// Root event followed by one event per line that received a positive delta.
    pub fn for_receipt(order: &PurchaseOrder, plans: &[LinePlan], occurred_at: DateTime<Utc>) -> Vec<Self> {
        let mut events = Vec::with_capacity(plans.len() + 1);
        events.push(ReceivingEvent::OrderReceived(OrderReceived {
            tenant_id: order.tenant_id,
            order_id: order.id,
            status: order.status,
            line_count: plans.len(),
            total_delta: plans.iter().map(|p| p.line.delta_qty).sum(),
            occurred_at,
        }));

        events.extend(plans.iter().filter(|p| p.line.delta_qty > 0).map(|p| {
            ReceivingEvent::LineReceived(LineReceived {
                tenant_id: order.tenant_id,
                order_id: order.id,
                line_id: p.line.line_id,
                item_id: p.line.item_id,
                delta_qty: p.line.delta_qty,
                received_qty: p.received_after,
                ordered_qty: p.line.ordered_qty,
                lot: p.line.lot.clone(),
                location_id: p.line.location_id.clone(),
                occurred_at,
            })
        }));

        events
    }
}

impl Event for ReceivingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReceivingEvent::OrderReceived(_) => "purchasing.order.received",
            ReceivingEvent::LineReceived(_) => "purchasing.order.line_received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReceivingEvent::OrderReceived(e) => e.occurred_at,
            ReceivingEvent::LineReceived(e) => e.occurred_at,
        }
    }
}
