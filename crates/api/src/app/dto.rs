use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dockyard_purchasing::{OrderLine, PurchaseOrder, ReceiptLine};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveGoodsRequest {
    #[serde(default)]
    pub lines: Vec<ReceiveLineRequest>,
    /// Used when the `Idempotency-Key` header is absent.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveLineRequest {
    /// Stable line id or legacy line reference.
    #[serde(alias = "lineId")]
    pub line_ref: String,
    pub delta_qty: i64,
    #[serde(default)]
    pub lot: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
}

impl From<ReceiveLineRequest> for ReceiptLine {
    fn from(value: ReceiveLineRequest) -> Self {
        let mut line = ReceiptLine::new(value.line_ref, value.delta_qty);
        line.lot = value.lot;
        line.location_id = value.location_id;
        line
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderResponse {
    pub id: String,
    pub status: String,
    pub vendor_id: Option<String>,
    pub lines: Vec<OrderLineResponse>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_ref: Option<String>,
    pub item_id: String,
    pub ordered_qty: i64,
    pub received_qty: i64,
    pub backorder_request_ids: Vec<String>,
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            id: line.id.to_string(),
            legacy_ref: line.legacy_ref.clone(),
            item_id: line.item_id.to_string(),
            ordered_qty: line.ordered_qty,
            received_qty: line.received_qty,
            backorder_request_ids: line.backorder_request_ids.iter().map(ToString::to_string).collect(),
        }
    }
}

impl From<&PurchaseOrder> for PurchaseOrderResponse {
    fn from(order: &PurchaseOrder) -> Self {
        Self {
            id: order.id.to_string(),
            status: order.status.as_str().to_string(),
            vendor_id: order.vendor_id.map(|v| v.to_string()),
            lines: order.lines.iter().map(OrderLineResponse::from).collect(),
            updated_at: order.updated_at,
        }
    }
}
