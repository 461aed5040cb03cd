//! Integration tests for the receiving pipeline.
//!
//! ReceiveGoods → ReceivingWorkflow → ledger / backorders / order store →
//! idempotency markers → event bus
//!
//! Verifies:
//! - Partial and full receipts update counters and status
//! - Over-receive is rejected without touching the ledger
//! - Key and signature replays return the first response
//! - Best-effort sub-operations fail without voiding the receipt

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use proptest::prelude::*;

    use dockyard_core::{AggregateId, TenantId};
    use dockyard_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
    use dockyard_inventory::{InventoryItemId, InventoryMovement};
    use dockyard_parties::{Party, PartyId, PartyRole};
    use dockyard_purchasing::{
        IdempotencyKey, OrderLine, OrderStatus, PurchaseOrder, PurchaseOrderId, ReceiptLine, ReceiptPatch,
        ReceiveGoods, ReceiveShortfall,
    };
    use dockyard_sales::{
        BackorderRequest, BackorderRequestId, BackorderStatus, SalesOrderId, SalesOrderLineId,
    };

    use crate::config::ReceivingConfig;
    use crate::idempotency::{
        IdempotencyKind, IdempotencyRecord, IdempotencyStore, IdempotencyStoreError, InMemoryIdempotencyStore,
    };
    use crate::ledger::{
        InMemoryMovementLedger, LedgerError, MovementLedger, MovementPage, PageRequest, sum_received_by_line,
    };
    use crate::notifier::{BusNotifier, EmitReceipt, EventNotifier, NotifyError};
    use crate::receiving::{
        ReceiveError, ReceiveErrorCode, ReceivingPorts, ReceivingWorkflow, SubOperation,
    };
    use crate::store::{
        InMemoryBackorderStore, InMemoryOrderStore, InMemoryPartyDirectory, OrderStore, StoreError, TenantStore,
    };

    type Bus = Arc<InMemoryEventBus<EventEnvelope>>;

    struct Harness {
        tenant_id: TenantId,
        orders: Arc<InMemoryOrderStore>,
        backorders: Arc<InMemoryBackorderStore>,
        parties: Arc<InMemoryPartyDirectory>,
        ledger: Arc<InMemoryMovementLedger>,
        idempotency: Arc<InMemoryIdempotencyStore>,
        bus: Bus,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                tenant_id: TenantId::new(),
                orders: Arc::new(InMemoryOrderStore::new()),
                backorders: Arc::new(InMemoryBackorderStore::new()),
                parties: Arc::new(InMemoryPartyDirectory::new()),
                ledger: Arc::new(InMemoryMovementLedger::new()),
                idempotency: Arc::new(InMemoryIdempotencyStore::new()),
                bus: Arc::new(InMemoryEventBus::new()),
            }
        }

        fn ports(&self) -> ReceivingPorts {
            ReceivingPorts {
                orders: self.orders.clone(),
                backorders: self.backorders.clone(),
                parties: self.parties.clone(),
                ledger: self.ledger.clone(),
                idempotency: self.idempotency.clone(),
                notifier: Arc::new(BusNotifier::new(self.bus.clone())),
            }
        }

        fn workflow(&self) -> ReceivingWorkflow {
            ReceivingWorkflow::new(self.ports(), ReceivingConfig::default())
        }

        fn vendor(&self, roles: Vec<PartyRole>) -> PartyId {
            let party = Party::new(self.tenant_id, PartyId::generate(), "Acme Supply", roles).unwrap();
            self.parties.upsert(self.tenant_id, party.id, party.clone()).unwrap();
            party.id
        }

        fn order(&self, lines: Vec<OrderLine>) -> PurchaseOrder {
            let vendor = self.vendor(vec![PartyRole::Vendor]);
            self.order_for(Some(vendor), lines, OrderStatus::Approved)
        }

        fn order_for(&self, vendor: Option<PartyId>, lines: Vec<OrderLine>, status: OrderStatus) -> PurchaseOrder {
            let order = PurchaseOrder::new(self.tenant_id, PurchaseOrderId::generate(), vendor, lines, Utc::now())
                .with_status(status);
            self.orders.upsert(self.tenant_id, order.id, order.clone()).unwrap();
            order
        }

        fn backorder(&self, qty: i64) -> BackorderRequestId {
            let b = BackorderRequest::open(
                self.tenant_id,
                BackorderRequestId::generate(),
                SalesOrderId::generate(),
                SalesOrderLineId::generate(),
                InventoryItemId::generate(),
                qty,
            )
            .unwrap();
            self.backorders.upsert(self.tenant_id, b.id, b.clone()).unwrap();
            b.id
        }

        fn receive(&self, order: &PurchaseOrder, lines: Vec<ReceiptLine>, key: Option<&str>) -> ReceiveGoods {
            ReceiveGoods {
                tenant_id: self.tenant_id,
                order_id: order.id,
                lines,
                idempotency_key: key.map(|k| IdempotencyKey::new(k).unwrap()),
                received_at: Utc::now(),
            }
        }

        fn movements(&self) -> usize {
            self.ledger.len(self.tenant_id)
        }
    }

    fn line(qty: i64) -> OrderLine {
        OrderLine::new(InventoryItemId::generate(), qty).unwrap()
    }

    fn on(line: &OrderLine, delta: i64) -> ReceiptLine {
        ReceiptLine::new(line.id.to_string(), delta)
    }

    #[test]
    fn partial_then_full_receipt_then_over_receive() {
        let h = Harness::new();
        let l = line(10);
        let order = h.order(vec![l.clone()]);
        let wf = h.workflow();

        let first = wf.receive(h.receive(&order, vec![on(&l, 4)], None)).unwrap();
        assert_eq!(first.order.lines[0].received_qty, 4);
        assert_eq!(first.order.status, OrderStatus::PartiallyReceived);
        assert!(first.skipped.is_empty());

        let second = wf.receive(h.receive(&order, vec![on(&l, 6)], None)).unwrap();
        assert_eq!(second.order.lines[0].received_qty, 10);
        assert_eq!(second.order.status, OrderStatus::Fulfilled);

        let err = wf.receive(h.receive(&order, vec![on(&l, 1)], None)).unwrap_err();
        assert_eq!(err.http_status(), 409);
        match err {
            ReceiveError::Conflict { code, shortfall, .. } => {
                assert_eq!(code, ReceiveErrorCode::ReceiveExceedsRemaining);
                assert_eq!(
                    shortfall,
                    Some(ReceiveShortfall {
                        line_id: l.id,
                        ordered: 10,
                        received: 10,
                        remaining: 0,
                        attempted_delta: 1,
                    })
                );
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(h.movements(), 2);
    }

    #[test]
    fn repeated_key_returns_cached_order_without_new_movements() {
        let h = Harness::new();
        let l = line(10);
        let order = h.order(vec![l.clone()]);
        let wf = h.workflow();

        let first = wf.receive(h.receive(&order, vec![on(&l, 4)], Some("K"))).unwrap();
        // Same key, different body.
        let again = wf.receive(h.receive(&order, vec![on(&l, 5)], Some("K"))).unwrap();

        assert_eq!(again.order, first.order);
        assert_eq!(again.replay, Some(IdempotencyKind::ExplicitKey));
        assert_eq!(h.movements(), 1);
    }

    #[test]
    fn key_first_seen_on_a_signature_replay_is_bound_to_that_response() {
        let h = Harness::new();
        let l = line(10);
        let order = h.order(vec![l.clone()]);
        let wf = h.workflow();

        let first = wf.receive(h.receive(&order, vec![on(&l, 3)], Some("K1"))).unwrap();
        let by_signature = wf.receive(h.receive(&order, vec![on(&l, 3)], Some("K2"))).unwrap();
        assert_eq!(by_signature.replay, Some(IdempotencyKind::ContentSignature));

        // K2 now replays on its own, whatever the body.
        let by_key = wf.receive(h.receive(&order, vec![on(&l, 1)], Some("K2"))).unwrap();
        assert_eq!(by_key.replay, Some(IdempotencyKind::ExplicitKey));
        assert_eq!(by_key.order, first.order);
        assert_eq!(h.movements(), 1);
        assert_eq!(h.orders.get(h.tenant_id, &order.id).unwrap().unwrap().lines[0].received_qty, 3);
    }

    #[test]
    fn overflowing_delta_is_rejected_as_over_receive() {
        let h = Harness::new();
        let l = line(10);
        let order = h.order(vec![l.clone()]);
        let wf = h.workflow();

        wf.receive(h.receive(&order, vec![on(&l, 4)], None)).unwrap();
        let err = wf.receive(h.receive(&order, vec![on(&l, i64::MAX)], None)).unwrap_err();

        match err {
            ReceiveError::Conflict { code, shortfall, .. } => {
                assert_eq!(code, ReceiveErrorCode::ReceiveExceedsRemaining);
                let shortfall = shortfall.unwrap();
                assert_eq!((shortfall.received, shortfall.remaining), (4, 6));
                assert_eq!(shortfall.attempted_delta, i64::MAX);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(h.movements(), 1);

        // Two entries that only overflow together.
        let err = wf
            .receive(h.receive(&order, vec![on(&l, 5), on(&l, i64::MAX - 2)], None))
            .unwrap_err();
        assert_eq!(err.code(), ReceiveErrorCode::ReceiveExceedsRemaining);
        assert_eq!(h.movements(), 1);
    }

    #[test]
    fn same_payload_under_a_new_key_replays_by_signature() {
        let h = Harness::new();
        let l = line(10).with_legacy_ref("1");
        let order = h.order(vec![l.clone()]);
        let wf = h.workflow();

        let first = wf
            .receive(h.receive(&order, vec![on(&l, 3).with_lot("LOT-7")], Some("K1")))
            .unwrap();
        // Legacy reference and padded lot normalize to the same content.
        let again = wf
            .receive(h.receive(&order, vec![ReceiptLine::new("1", 3).with_lot(" LOT-7 ")], Some("K2")))
            .unwrap();

        assert_eq!(again.order, first.order);
        assert_eq!(again.replay, Some(IdempotencyKind::ContentSignature));
        assert_eq!(h.movements(), 1);
    }

    #[test]
    fn replay_returns_first_response_even_after_later_receipts() {
        let h = Harness::new();
        let l = line(10);
        let order = h.order(vec![l.clone()]);
        let wf = h.workflow();

        let first = wf.receive(h.receive(&order, vec![on(&l, 2)], Some("A"))).unwrap();
        wf.receive(h.receive(&order, vec![on(&l, 5)], Some("B"))).unwrap();

        let replay = wf.receive(h.receive(&order, vec![on(&l, 2)], Some("A"))).unwrap();
        assert_eq!(replay.order.lines[0].received_qty, 2);
        assert_eq!(replay.order, first.order);
    }

    #[test]
    fn invalid_request_is_revalidated_not_served_from_signature() {
        let h = Harness::new();
        let l = line(5);
        let order = h.order(vec![l.clone(), line(5)]);
        let wf = h.workflow();

        wf.receive(h.receive(&order, vec![on(&l, 5)], None)).unwrap();
        // The signature of this payload is recorded, but the line is now complete.
        let err = wf.receive(h.receive(&order, vec![on(&l, 5)], None)).unwrap_err();
        assert_eq!(err.code(), ReceiveErrorCode::ReceiveExceedsRemaining);
        assert_eq!(h.movements(), 1);
    }

    #[test]
    fn receipt_fulfills_linked_backorder() {
        let h = Harness::new();
        let bo = h.backorder(5);
        let l = line(10).with_backorders(vec![bo]);
        let order = h.order(vec![l.clone()]);

        h.workflow().receive(h.receive(&order, vec![on(&l, 5)], None)).unwrap();

        let stored = h.backorders.get(h.tenant_id, &bo).unwrap().unwrap();
        assert_eq!(stored.status, BackorderStatus::Fulfilled);
        assert_eq!(stored.remaining_qty, Some(0));
        assert_eq!(stored.fulfilled_qty, 5);
    }

    #[test]
    fn every_linked_backorder_is_reduced_by_the_full_delta() {
        let h = Harness::new();
        let (a, b, ghost) = (h.backorder(10), h.backorder(4), BackorderRequestId::generate());
        let l = line(10).with_backorders(vec![a, ghost, b]);
        let order = h.order(vec![l.clone()]);

        let outcome = h.workflow().receive(h.receive(&order, vec![on(&l, 3)], None)).unwrap();
        assert!(outcome.skipped.is_empty());

        let a = h.backorders.get(h.tenant_id, &a).unwrap().unwrap();
        let b = h.backorders.get(h.tenant_id, &b).unwrap().unwrap();
        assert_eq!((a.remaining_qty, a.fulfilled_qty), (Some(7), 3));
        assert_eq!((b.remaining_qty, b.fulfilled_qty), (Some(1), 3));
    }

    #[test]
    fn status_and_vendor_guards() {
        let h = Harness::new();
        let wf = h.workflow();
        let l = line(3);

        for status in [OrderStatus::Draft, OrderStatus::Cancelled, OrderStatus::Closed] {
            let vendor = h.vendor(vec![PartyRole::Vendor]);
            let order = h.order_for(Some(vendor), vec![l.clone()], status);
            let err = wf.receive(h.receive(&order, vec![on(&l, 1)], None)).unwrap_err();
            assert_eq!((err.http_status(), err.code()), (409, ReceiveErrorCode::OrderNotReceivable));
        }

        let no_vendor = h.order_for(None, vec![l.clone()], OrderStatus::Approved);
        let customer = h.vendor(vec![PartyRole::Customer]);
        let not_vendor = h.order_for(Some(customer), vec![l.clone()], OrderStatus::Approved);
        let unknown = h.order_for(Some(PartyId::generate()), vec![l.clone()], OrderStatus::Approved);

        for (order, code) in [
            (no_vendor, ReceiveErrorCode::VendorRequired),
            (not_vendor, ReceiveErrorCode::VendorRoleRequired),
            (unknown, ReceiveErrorCode::VendorNotFound),
        ] {
            let err = wf.receive(h.receive(&order, vec![on(&l, 1)], None)).unwrap_err();
            assert_eq!((err.http_status(), err.code()), (400, code));
        }

        let mut suspended = Party::new(h.tenant_id, PartyId::generate(), "Gone Ltd", vec![PartyRole::Vendor]).unwrap();
        suspended.suspend();
        h.parties.upsert(h.tenant_id, suspended.id, suspended.clone()).unwrap();
        let inactive = h.order_for(Some(suspended.id), vec![l.clone()], OrderStatus::Approved);
        let err = wf.receive(h.receive(&inactive, vec![on(&l, 1)], None)).unwrap_err();
        assert_eq!(err.code(), ReceiveErrorCode::VendorInactive);

        let relaxed = ReceivingWorkflow::new(
            h.ports(),
            ReceivingConfig {
                require_vendor: false,
                ..ReceivingConfig::default()
            },
        );
        let order = h.order_for(None, vec![l.clone()], OrderStatus::Approved);
        assert!(relaxed.receive(h.receive(&order, vec![on(&l, 1)], None)).is_ok());
        assert_eq!(h.movements(), 1);
    }

    #[test]
    fn request_validation_errors() {
        let h = Harness::new();
        let l = line(3);
        let order = h.order(vec![l.clone()]);
        let wf = h.workflow();

        let cases = [
            (vec![], ReceiveErrorCode::LinesRequired),
            (vec![ReceiptLine::new("missing", 1)], ReceiveErrorCode::UnknownLine),
            (vec![on(&l, 0)], ReceiveErrorCode::InvalidDelta),
            (vec![on(&l, -2)], ReceiveErrorCode::InvalidDelta),
        ];
        for (lines, code) in cases {
            let err = wf.receive(h.receive(&order, lines, None)).unwrap_err();
            assert_eq!((err.http_status(), err.code()), (400, code));
        }

        let missing = ReceiveGoods {
            order_id: PurchaseOrderId::generate(),
            ..h.receive(&order, vec![on(&l, 1)], None)
        };
        assert_eq!(wf.receive(missing).unwrap_err().http_status(), 404);

        // Another tenant cannot see the order.
        let foreign = ReceiveGoods {
            tenant_id: TenantId::new(),
            ..h.receive(&order, vec![on(&l, 1)], None)
        };
        assert_eq!(wf.receive(foreign).unwrap_err().code(), ReceiveErrorCode::OrderNotFound);
        assert_eq!(h.movements(), 0);
    }

    #[test]
    fn events_are_published_after_commit() {
        let h = Harness::new();
        let sub: Subscription<EventEnvelope> = h.bus.subscribe();
        let (a, b) = (line(5), line(5));
        let order = h.order(vec![a.clone(), b.clone()]);

        h.workflow()
            .receive(h.receive(&order, vec![on(&a, 2), on(&b, 1)], None))
            .unwrap();

        let types: Vec<String> = sub.drain().iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(
            types,
            vec![
                "purchasing.order.received",
                "purchasing.order.line_received",
                "purchasing.order.line_received",
            ]
        );
    }

    #[test]
    fn counters_are_resynced_from_the_ledger() {
        let h = Harness::new();
        let (a, b) = (line(10), line(10));
        let order = h.order(vec![a.clone(), b.clone()]);

        // A receipt recorded in the ledger but never mirrored on the order.
        let stray = InventoryMovement::receive(h.tenant_id, b.item_id, 3, order.id.0, b.id.0, Utc::now()).unwrap();
        h.ledger.append(stray).unwrap();

        let outcome = h.workflow().receive(h.receive(&order, vec![on(&a, 1)], None)).unwrap();
        assert_eq!(outcome.order.lines[1].received_qty, 3);

        let err = h.workflow().receive(h.receive(&order, vec![on(&b, 8)], None)).unwrap_err();
        assert_eq!(err.code(), ReceiveErrorCode::ReceiveExceedsRemaining);
    }

    struct FailingLedger {
        inner: InMemoryMovementLedger,
    }

    impl MovementLedger for FailingLedger {
        fn append(&self, _movement: InventoryMovement) -> Result<(), LedgerError> {
            Err(LedgerError::Backend("disk full".to_string()))
        }

        fn query_by_ref(
            &self,
            tenant_id: TenantId,
            ref_id: AggregateId,
            page: PageRequest,
        ) -> Result<MovementPage, LedgerError> {
            self.inner.query_by_ref(tenant_id, ref_id, page)
        }
    }

    struct FailingNotifier;

    impl EventNotifier for FailingNotifier {
        fn emit(&self, _envelope: EventEnvelope) -> Result<EmitReceipt, NotifyError> {
            Err(NotifyError::Provider {
                provider: "webhook".to_string(),
                message: "timeout".to_string(),
            })
        }
    }

    struct ReadOnlyIdempotency;

    impl IdempotencyStore for ReadOnlyIdempotency {
        fn find(
            &self,
            _tenant_id: TenantId,
            _scope: &str,
            _ref_id: AggregateId,
            _kind: IdempotencyKind,
            _value: &str,
        ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError> {
            Ok(None)
        }

        fn insert_if_absent(&self, _record: IdempotencyRecord) -> Result<bool, IdempotencyStoreError> {
            Err(IdempotencyStoreError::Backend("read-only replica".to_string()))
        }
    }

    #[test]
    fn best_effort_failures_are_reported_not_raised() {
        let h = Harness::new();
        let (a, b) = (line(10), line(10));
        let order = h.order(vec![a.clone(), b.clone()]);

        let wf = ReceivingWorkflow::new(
            ReceivingPorts {
                ledger: Arc::new(FailingLedger {
                    inner: InMemoryMovementLedger::new(),
                }),
                notifier: Arc::new(FailingNotifier),
                idempotency: Arc::new(ReadOnlyIdempotency),
                ..h.ports()
            },
            ReceivingConfig::default(),
        );

        let outcome = wf
            .receive(h.receive(&order, vec![on(&a, 4), on(&b, 2)], Some("K")))
            .unwrap();

        assert_eq!(outcome.order.lines[0].received_qty, 4);
        assert_eq!(outcome.order.status, OrderStatus::PartiallyReceived);

        let ops: Vec<SubOperation> = outcome.skipped.iter().map(|s| s.operation).collect();
        assert_eq!(ops.iter().filter(|op| **op == SubOperation::LedgerAppend).count(), 2);
        assert_eq!(ops.iter().filter(|op| **op == SubOperation::MarkApplied).count(), 1);
        assert_eq!(ops.iter().filter(|op| **op == SubOperation::EventEmission).count(), 3);
    }

    struct UnsavableOrders {
        inner: Arc<InMemoryOrderStore>,
    }

    impl OrderStore for UnsavableOrders {
        fn load(&self, tenant_id: TenantId, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError> {
            OrderStore::load(&*self.inner, tenant_id, id)
        }

        fn save(
            &self,
            _tenant_id: TenantId,
            _id: PurchaseOrderId,
            _patch: &ReceiptPatch,
        ) -> Result<PurchaseOrder, StoreError> {
            Err(StoreError::Backend("connection reset".to_string()))
        }
    }

    #[test]
    fn failed_order_save_aborts_without_marking_applied() {
        let h = Harness::new();
        let l = line(10);
        let order = h.order(vec![l.clone()]);

        let wf = ReceivingWorkflow::new(
            ReceivingPorts {
                orders: Arc::new(UnsavableOrders {
                    inner: h.orders.clone(),
                }),
                ..h.ports()
            },
            ReceivingConfig::default(),
        );

        let err = wf.receive(h.receive(&order, vec![on(&l, 4)], Some("K"))).unwrap_err();
        assert_eq!((err.http_status(), err.code()), (500, ReceiveErrorCode::Internal));
        assert!(h.idempotency.is_empty());
    }

    proptest! {
        #[test]
        fn applied_deltas_never_exceed_ordered(
            ordered in 1i64..30,
            deltas in prop::collection::vec(-2i64..12, 1..15),
        ) {
            let h = Harness::new();
            let l = line(ordered);
            let order = h.order(vec![l.clone()]);
            let wf = h.workflow();

            let mut accepted = 0i64;
            for delta in deltas {
                let before = h.movements();
                match wf.receive(h.receive(&order, vec![on(&l, delta)], None)) {
                    Ok(outcome) if outcome.replay.is_none() => {
                        accepted += delta;
                        prop_assert!(accepted <= ordered);
                        prop_assert_eq!(outcome.order.lines[0].received_qty, accepted);
                        let expected = if accepted == ordered {
                            OrderStatus::Fulfilled
                        } else {
                            OrderStatus::PartiallyReceived
                        };
                        prop_assert_eq!(outcome.order.status, expected);
                    }
                    Ok(_) => prop_assert_eq!(h.movements(), before),
                    Err(_) => prop_assert_eq!(h.movements(), before),
                }
            }

            let totals = sum_received_by_line(&*h.ledger, h.tenant_id, order.id.0, 7).unwrap();
            prop_assert_eq!(totals.get(l.id.0), accepted);
        }
    }
}
