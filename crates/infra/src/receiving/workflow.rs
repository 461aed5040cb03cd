use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use dockyard_core::TenantId;
use dockyard_events::EventEnvelope;
use dockyard_inventory::InventoryMovement;
use dockyard_purchasing::{
    ContentSignature, LinePlan, OrderLineId, PurchaseOrder, PurchaseOrderId, ReceiptPatch, ReceiveGoods,
    ReceivingEvent, normalize_lines, plan_receipt,
};

use super::cascade::BackorderCascade;
use super::error::{ReceiveError, ReceiveErrorCode};
use super::policy::{SkippedStep, SubOperation};
use crate::config::ReceivingConfig;
use crate::idempotency::{IdempotencyGuard, IdempotencyKind, IdempotencyStore};
use crate::ledger::{MovementLedger, sum_received_by_line};
use crate::notifier::EventNotifier;
use crate::store::{BackorderStore, OrderStore, PartyDirectory};

/// Collaborators the workflow is wired against.
#[derive(Clone)]
pub struct ReceivingPorts {
    pub orders: Arc<dyn OrderStore>,
    pub backorders: Arc<dyn BackorderStore>,
    pub parties: Arc<dyn PartyDirectory>,
    pub ledger: Arc<dyn MovementLedger>,
    pub idempotency: Arc<dyn IdempotencyStore>,
    pub notifier: Arc<dyn EventNotifier>,
}

/// Result of a receive call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveOutcome {
    pub order: PurchaseOrder,
    /// Set when the response was served from an idempotency record.
    pub replay: Option<IdempotencyKind>,
    /// Best-effort sub-operations that failed and were skipped.
    pub skipped: Vec<SkippedStep>,
}

impl ReceiveOutcome {
    fn replayed(order: PurchaseOrder, kind: IdempotencyKind, skipped: Vec<SkippedStep>) -> Self {
        Self {
            order,
            replay: Some(kind),
            skipped,
        }
    }

    pub fn is_replay(&self) -> bool {
        self.replay.is_some()
    }
}

/// Applies goods receipts to purchase orders.
///
/// No step runs inside a cross-document transaction. Consistency comes from
/// the order of the steps in [`ReceivingWorkflow::receive`] and the two
/// idempotency checks; a crash between saving the order and writing the
/// idempotency markers can re-apply a retried request.
pub struct ReceivingWorkflow {
    orders: Arc<dyn OrderStore>,
    parties: Arc<dyn PartyDirectory>,
    ledger: Arc<dyn MovementLedger>,
    notifier: Arc<dyn EventNotifier>,
    guard: IdempotencyGuard,
    cascade: BackorderCascade,
    config: ReceivingConfig,
}

impl ReceivingWorkflow {
    pub fn new(ports: ReceivingPorts, config: ReceivingConfig) -> Self {
        Self {
            orders: ports.orders,
            parties: ports.parties,
            ledger: ports.ledger,
            notifier: ports.notifier,
            guard: IdempotencyGuard::new(ports.idempotency, config.idempotency_scope.clone()),
            cascade: BackorderCascade::new(ports.backorders),
            config,
        }
    }

    pub fn config(&self) -> &ReceivingConfig {
        &self.config
    }

    /// Load an order for the read endpoint.
    pub fn order(&self, tenant_id: TenantId, id: PurchaseOrderId) -> Result<PurchaseOrder, ReceiveError> {
        self.load_order(tenant_id, id)
    }

    #[instrument(
        skip(self, cmd),
        fields(tenant_id = %cmd.tenant_id, order_id = %cmd.order_id, lines = cmd.lines.len())
    )]
    pub fn receive(&self, cmd: ReceiveGoods) -> Result<ReceiveOutcome, ReceiveError> {
        let tenant_id = cmd.tenant_id;
        let order = self.load_order(tenant_id, cmd.order_id)?;

        if let Some(key) = &cmd.idempotency_key {
            if let Some(previous) = self.guard.check_key(tenant_id, order.id, key)? {
                info!(%tenant_id, order_id = %order.id, "idempotency key replay");
                return Ok(ReceiveOutcome::replayed(previous, IdempotencyKind::ExplicitKey, Vec::new()));
            }
        }

        order.ensure_receivable().map_err(|e| ReceiveError::Conflict {
            code: ReceiveErrorCode::OrderNotReceivable,
            message: e.to_string(),
            shortfall: None,
        })?;

        if self.config.require_vendor {
            self.ensure_vendor(&order)?;
        }

        let normalized = normalize_lines(&order, &cmd.lines)?;
        let signature = ContentSignature::of(&normalized);

        let received = sum_received_by_line(&*self.ledger, tenant_id, order.id.0, self.config.ledger_page_size)?;
        let plans = plan_receipt(normalized, &received)?;

        let mut skipped = Vec::new();

        // Only a validated request may be answered from the signature record.
        if let Some(previous) = self.guard.check_signature(tenant_id, order.id, &signature)? {
            info!(%tenant_id, order_id = %order.id, %signature, "content signature replay");
            if let Some(key) = &cmd.idempotency_key {
                if let Err(e) = self.guard.remember_key(tenant_id, order.id, key, &previous) {
                    error!(%tenant_id, order_id = %order.id, error = %e, "binding key to replayed receipt failed");
                    SubOperation::MarkApplied.settle(order.id, e, &mut skipped)?;
                }
            }
            return Ok(ReceiveOutcome::replayed(previous, IdempotencyKind::ContentSignature, skipped));
        }

        let mut running: HashMap<OrderLineId, i64> =
            order.lines.iter().map(|l| (l.id, received.get(l.id.0))).collect();
        for plan in &plans {
            self.append_movement(&order, plan, &cmd, &mut skipped)?;
            running.insert(plan.line.line_id, plan.received_after);
        }

        for plan in plans.iter().filter(|p| !p.line.backorder_request_ids.is_empty()) {
            let report = self
                .cascade
                .apply(tenant_id, &plan.line.backorder_request_ids, plan.line.delta_qty)?;
            skipped.extend(report.failed);
        }

        let status = order.status_after_receipt(|id| running.get(&id).copied().unwrap_or(0));
        let patch = ReceiptPatch {
            status,
            received: order.lines.iter().map(|l| (l.id, running.get(&l.id).copied().unwrap_or(0))).collect(),
            updated_at: cmd.received_at,
        };
        let saved = match self.orders.save(tenant_id, order.id, &patch) {
            Ok(saved) => saved,
            Err(e) => {
                error!(%tenant_id, order_id = %order.id, error = %e, "order save failed after ledger append");
                SubOperation::OrderSave.settle(order.id, e, &mut skipped)?;
                let mut unsaved = order.clone();
                unsaved.apply_patch(&patch);
                unsaved
            }
        };

        if let Err(e) = self
            .guard
            .mark_applied(tenant_id, order.id, cmd.idempotency_key.as_ref(), &signature, &saved)
        {
            error!(%tenant_id, order_id = %order.id, error = %e, "idempotency mark failed; retries may re-apply");
            SubOperation::MarkApplied.settle(order.id, e, &mut skipped)?;
        }

        self.emit(&saved, &plans, &cmd, &mut skipped)?;

        info!(
            %tenant_id,
            order_id = %saved.id,
            status = %saved.status,
            skipped = skipped.len(),
            "receipt applied"
        );
        Ok(ReceiveOutcome {
            order: saved,
            replay: None,
            skipped,
        })
    }

    fn load_order(&self, tenant_id: TenantId, id: PurchaseOrderId) -> Result<PurchaseOrder, ReceiveError> {
        let order = self.orders.load(tenant_id, id).map_err(|e| {
            error!(%tenant_id, order_id = %id, error = %e, "order load failed");
            ReceiveError::from(e)
        })?;

        match order {
            Some(order) if order.tenant_id == tenant_id => Ok(order),
            _ => Err(ReceiveError::OrderNotFound(id)),
        }
    }

    fn ensure_vendor(&self, order: &PurchaseOrder) -> Result<(), ReceiveError> {
        let vendor_id = order.vendor_id.ok_or_else(|| {
            ReceiveError::invalid(
                ReceiveErrorCode::VendorRequired,
                "purchase order has no vendor",
                "vendorId",
            )
        })?;

        let party = self.parties.load(order.tenant_id, vendor_id)?.ok_or_else(|| {
            ReceiveError::invalid(
                ReceiveErrorCode::VendorNotFound,
                format!("vendor {vendor_id} not found"),
                "vendorId",
            )
        })?;

        if !party.is_vendor() {
            return Err(ReceiveError::invalid(
                ReceiveErrorCode::VendorRoleRequired,
                format!("party {vendor_id} is not tagged as a vendor"),
                "vendorId",
            ));
        }
        if !party.can_transact() {
            return Err(ReceiveError::invalid(
                ReceiveErrorCode::VendorInactive,
                format!("vendor {vendor_id} is not active"),
                "vendorId",
            ));
        }
        Ok(())
    }

    fn append_movement(
        &self,
        order: &PurchaseOrder,
        plan: &LinePlan,
        cmd: &ReceiveGoods,
        skipped: &mut Vec<SkippedStep>,
    ) -> Result<(), ReceiveError> {
        let line = &plan.line;
        let result = InventoryMovement::receive(
            order.tenant_id,
            line.item_id,
            line.delta_qty,
            order.id.0,
            line.line_id.0,
            cmd.received_at,
        )
        .map_err(|e| e.to_string())
        .and_then(|m| {
            let m = m.with_lot(line.lot.clone()).with_location(line.location_id.clone());
            self.ledger.append(m).map_err(|e| e.to_string())
        });

        if let Err(reason) = result {
            warn!(
                tenant_id = %order.tenant_id,
                order_id = %order.id,
                line_id = %line.line_id,
                error = %reason,
                "ledger append failed"
            );
            SubOperation::LedgerAppend
                .settle(line.line_id, reason, skipped)
                .map_err(ReceiveError::Internal)?;
        }
        Ok(())
    }

    fn emit(
        &self,
        order: &PurchaseOrder,
        plans: &[LinePlan],
        cmd: &ReceiveGoods,
        skipped: &mut Vec<SkippedStep>,
    ) -> Result<(), ReceiveError> {
        for event in ReceivingEvent::for_receipt(order, plans, cmd.received_at) {
            let result = EventEnvelope::from_typed(order.tenant_id, order.id.0, &event)
                .map_err(|e| e.to_string())
                .and_then(|envelope| self.notifier.emit(envelope).map_err(|e| e.to_string()));

            match result {
                Ok(receipt) if !receipt.emitted => {
                    info!(provider = %receipt.provider, "receiving event not emitted by provider");
                }
                Ok(_) => {}
                Err(reason) => {
                    let event_type = dockyard_events::Event::event_type(&event);
                    warn!(
                        tenant_id = %order.tenant_id,
                        order_id = %order.id,
                        event_type,
                        error = %reason,
                        "event emission failed"
                    );
                    SubOperation::EventEmission
                        .settle(event_type, reason, skipped)
                        .map_err(ReceiveError::Internal)?;
                }
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for ReceivingWorkflow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReceivingWorkflow")
            .field("guard", &self.guard)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
