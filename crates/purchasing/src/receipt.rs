//! Goods receipt requests and their validation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dockyard_core::{DomainError, TenantId};
use dockyard_inventory::{InventoryItemId, ReceivedByLine};
use dockyard_sales::BackorderRequestId;

use crate::order::{OrderLineId, PurchaseOrder, PurchaseOrderId};

const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Caller's reference to an order line: a stable line id or a legacy reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineRef(String);

impl LineRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for LineRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied retry token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let key = raw.trim();
        if key.is_empty() {
            return Err(DomainError::validation("idempotency key cannot be empty"));
        }
        if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(DomainError::validation(format!(
                "idempotency key longer than {MAX_IDEMPOTENCY_KEY_LEN} bytes"
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One requested line of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub line_ref: LineRef,
    pub delta_qty: i64,
    #[serde(default)]
    pub lot: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
}

impl ReceiptLine {
    pub fn new(line_ref: impl Into<String>, delta_qty: i64) -> Self {
        Self {
            line_ref: LineRef::new(line_ref),
            delta_qty,
            lot: None,
            location_id: None,
        }
    }

    pub fn with_lot(mut self, lot: impl Into<String>) -> Self {
        self.lot = Some(lot.into());
        self
    }

    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }
}

/// Command: receive goods against a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveGoods {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub lines: Vec<ReceiptLine>,
    pub idempotency_key: Option<IdempotencyKey>,
    pub received_at: DateTime<Utc>,
}

/// A requested line resolved against the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    pub line_id: OrderLineId,
    pub item_id: InventoryItemId,
    pub ordered_qty: i64,
    pub delta_qty: i64,
    pub lot: Option<String>,
    pub location_id: Option<String>,
    pub backorder_request_ids: Vec<BackorderRequestId>,
}

/// A validated line with its before/after received totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePlan {
    pub line: NormalizedLine,
    pub prior_received: i64,
    pub received_after: i64,
}

/// Over-receive detail returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveShortfall {
    pub line_id: OrderLineId,
    pub ordered: i64,
    pub received: i64,
    pub remaining: i64,
    pub attempted_delta: i64,
}

/// Why a receipt request was refused before any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptRejection {
    LinesRequired,
    UnknownLine(LineRef),
    InvalidDelta { line_ref: LineRef, delta: i64 },
    ExceedsRemaining(ReceiveShortfall),
}

fn normalize_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolve every requested line against the order.
///
/// Blank lot/location values are treated as absent.
pub fn normalize_lines(
    order: &PurchaseOrder,
    lines: &[ReceiptLine],
) -> Result<Vec<NormalizedLine>, ReceiptRejection> {
    if lines.is_empty() {
        return Err(ReceiptRejection::LinesRequired);
    }

    lines
        .iter()
        .map(|req| {
            let line = order
                .find_line(&req.line_ref)
                .ok_or_else(|| ReceiptRejection::UnknownLine(req.line_ref.clone()))?;

            Ok(NormalizedLine {
                line_id: line.id,
                item_id: line.item_id,
                ordered_qty: line.ordered_qty,
                delta_qty: req.delta_qty,
                lot: normalize_text(&req.lot),
                location_id: normalize_text(&req.location_id),
                backorder_request_ids: line.backorder_request_ids.clone(),
            })
        })
        .collect()
}

/// Enforce the over-receive invariant against ledger-derived totals.
///
/// Several entries for the same line accumulate: each is checked against the
/// prior total plus the deltas already accepted earlier in the request.
pub fn plan_receipt(
    lines: Vec<NormalizedLine>,
    received: &ReceivedByLine,
) -> Result<Vec<LinePlan>, ReceiptRejection> {
    let mut running: HashMap<OrderLineId, i64> = HashMap::new();
    let mut plans = Vec::with_capacity(lines.len());

    for line in lines {
        if line.delta_qty <= 0 {
            return Err(ReceiptRejection::InvalidDelta {
                line_ref: LineRef::new(line.line_id.to_string()),
                delta: line.delta_qty,
            });
        }

        let prior = *running
            .entry(line.line_id)
            .or_insert_with(|| received.get(line.line_id.0));

        // Overflow can only mean the delta is far beyond what was ordered.
        let after = match prior.checked_add(line.delta_qty) {
            Some(after) if after <= line.ordered_qty => after,
            _ => {
                return Err(ReceiptRejection::ExceedsRemaining(ReceiveShortfall {
                    line_id: line.line_id,
                    ordered: line.ordered_qty,
                    received: prior,
                    remaining: (line.ordered_qty - prior).max(0),
                    attempted_delta: line.delta_qty,
                }));
            }
        };

        running.insert(line.line_id, after);
        plans.push(LinePlan {
            line,
            prior_received: prior,
            received_after: after,
        });
    }

    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderLine, OrderStatus};
    use dockyard_inventory::InventoryMovement;
    use proptest::prelude::*;

    fn order(lines: Vec<OrderLine>) -> PurchaseOrder {
        PurchaseOrder::new(TenantId::new(), PurchaseOrderId::generate(), None, lines, Utc::now())
            .with_status(OrderStatus::Approved)
    }

    fn received_from(order: &PurchaseOrder, entries: &[(OrderLineId, i64)]) -> ReceivedByLine {
        let mut agg = ReceivedByLine::new(order.id.0);
        for (line, qty) in entries {
            let m = InventoryMovement::receive(
                order.tenant_id,
                InventoryItemId::generate(),
                *qty,
                order.id.0,
                line.0,
                Utc::now(),
            )
            .unwrap();
            agg.record(&m);
        }
        agg
    }

    #[test]
    fn empty_request_is_rejected() {
        let po = order(vec![OrderLine::new(InventoryItemId::generate(), 10).unwrap()]);
        assert_eq!(normalize_lines(&po, &[]), Err(ReceiptRejection::LinesRequired));
    }

    #[test]
    fn unknown_line_is_rejected() {
        let po = order(vec![OrderLine::new(InventoryItemId::generate(), 10).unwrap()]);
        let err = normalize_lines(&po, &[ReceiptLine::new("nope", 1)]).unwrap_err();
        assert_eq!(err, ReceiptRejection::UnknownLine(LineRef::new("nope")));
    }

    #[test]
    fn legacy_reference_resolves_to_stable_line() {
        let line = OrderLine::new(InventoryItemId::generate(), 10)
            .unwrap()
            .with_legacy_ref("L-1");
        let id = line.id;
        let po = order(vec![line]);

        let normalized =
            normalize_lines(&po, &[ReceiptLine::new("L-1", 3).with_lot("  ").with_location(" A1 ")])
                .unwrap();
        assert_eq!(normalized[0].line_id, id);
        assert_eq!(normalized[0].lot, None);
        assert_eq!(normalized[0].location_id.as_deref(), Some("A1"));
    }

    #[test]
    fn non_positive_delta_is_rejected() {
        let line = OrderLine::new(InventoryItemId::generate(), 10).unwrap();
        let id = line.id;
        let po = order(vec![line]);
        let normalized = normalize_lines(&po, &[ReceiptLine::new(id.to_string(), 0)]).unwrap();

        let err = plan_receipt(normalized, &ReceivedByLine::new(po.id.0)).unwrap_err();
        assert!(matches!(err, ReceiptRejection::InvalidDelta { delta: 0, .. }));
    }

    #[test]
    fn over_receive_reports_shortfall() {
        let line = OrderLine::new(InventoryItemId::generate(), 10).unwrap();
        let id = line.id;
        let po = order(vec![line]);
        let received = received_from(&po, &[(id, 4), (id, 6)]);

        let normalized = normalize_lines(&po, &[ReceiptLine::new(id.to_string(), 1)]).unwrap();
        let err = plan_receipt(normalized, &received).unwrap_err();

        assert_eq!(
            err,
            ReceiptRejection::ExceedsRemaining(ReceiveShortfall {
                line_id: id,
                ordered: 10,
                received: 10,
                remaining: 0,
                attempted_delta: 1,
            })
        );
    }

    #[test]
    fn delta_that_would_overflow_is_an_over_receive() {
        let line = OrderLine::new(InventoryItemId::generate(), 10).unwrap();
        let id = line.id;
        let po = order(vec![line]);
        let received = received_from(&po, &[(id, 4)]);

        let normalized = normalize_lines(&po, &[ReceiptLine::new(id.to_string(), i64::MAX)]).unwrap();
        let err = plan_receipt(normalized, &received).unwrap_err();

        assert_eq!(
            err,
            ReceiptRejection::ExceedsRemaining(ReceiveShortfall {
                line_id: id,
                ordered: 10,
                received: 4,
                remaining: 6,
                attempted_delta: i64::MAX,
            })
        );
    }

    #[test]
    fn repeated_entries_for_one_line_accumulate() {
        let line = OrderLine::new(InventoryItemId::generate(), 10).unwrap();
        let id = line.id;
        let po = order(vec![line]);

        let normalized = normalize_lines(
            &po,
            &[ReceiptLine::new(id.to_string(), 6), ReceiptLine::new(id.to_string(), 5)],
        )
        .unwrap();
        let err = plan_receipt(normalized, &ReceivedByLine::new(po.id.0)).unwrap_err();

        match err {
            ReceiptRejection::ExceedsRemaining(s) => {
                assert_eq!((s.received, s.remaining, s.attempted_delta), (6, 4, 5));
            }
            other => panic!("unexpected rejection: {other:?}"),
        }
    }

    #[test]
    fn shortfall_serializes_camel_case() {
        let s = ReceiveShortfall {
            line_id: OrderLineId::generate(),
            ordered: 10,
            received: 10,
            remaining: 0,
            attempted_delta: 1,
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["attemptedDelta"], 1);
        assert!(json.get("lineId").is_some());
    }

    #[test]
    fn idempotency_key_is_trimmed_and_bounded() {
        assert_eq!(IdempotencyKey::new("  k-1 ").unwrap().as_str(), "k-1");
        assert!(IdempotencyKey::new("   ").is_err());
        assert!(IdempotencyKey::new("x".repeat(256)).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever sequence of deltas is attempted, the accepted
        /// ones never sum past the ordered quantity.
        #[test]
        fn accepted_deltas_never_exceed_ordered(
            ordered in 1i64..50,
            attempts in prop::collection::vec(-3i64..20, 1..30),
        ) {
            let line = OrderLine::new(InventoryItemId::generate(), ordered).unwrap();
            let id = line.id;
            let po = order(vec![line]);
            let mut accepted: Vec<(OrderLineId, i64)> = Vec::new();

            for delta in attempts {
                let received = received_from(&po, &accepted);
                let normalized =
                    normalize_lines(&po, &[ReceiptLine::new(id.to_string(), delta)]).unwrap();
                if let Ok(plans) = plan_receipt(normalized, &received) {
                    prop_assert!(delta > 0);
                    accepted.push((id, plans[0].line.delta_qty));
                }
                let total: i64 = accepted.iter().map(|(_, q)| q).sum();
                prop_assert!(total <= ordered);
            }
        }
    }
}
