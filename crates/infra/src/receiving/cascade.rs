use std::sync::Arc;

use tracing::{debug, warn};

use dockyard_core::TenantId;
use dockyard_sales::{BackorderRequestId, ReceiptEffect};

use super::policy::{SkippedStep, SubOperation};
use crate::store::{BackorderStore, StoreError};

/// Result of cascading one line's delta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub applied: Vec<(BackorderRequestId, ReceiptEffect)>,
    /// Linked ids with no stored backorder.
    pub missing: Vec<BackorderRequestId>,
    pub failed: Vec<SkippedStep>,
}

/// Draws linked backorder requests down by a line's receipt delta.
///
/// Every linked backorder sees the full delta; it is not split between them.
#[derive(Clone)]
pub struct BackorderCascade {
    store: Arc<dyn BackorderStore>,
}

impl BackorderCascade {
    pub fn new(store: Arc<dyn BackorderStore>) -> Self {
        Self { store }
    }

    /// Failures are settled per backorder through the policy table; an error
    /// is returned only when the table says to abort.
    pub fn apply(
        &self,
        tenant_id: TenantId,
        ids: &[BackorderRequestId],
        delta: i64,
    ) -> Result<CascadeReport, StoreError> {
        let mut report = CascadeReport::default();

        for &id in ids {
            let mut backorder = match self.store.load(tenant_id, id) {
                Ok(Some(b)) => b,
                Ok(None) => {
                    debug!(%tenant_id, backorder_id = %id, "linked backorder not found; ignored");
                    report.missing.push(id);
                    continue;
                }
                Err(e) => {
                    warn!(%tenant_id, backorder_id = %id, error = %e, "backorder load failed");
                    SubOperation::BackorderCascade.settle(id, e, &mut report.failed)?;
                    continue;
                }
            };

            let effect = backorder.apply_receipt(delta);
            if let ReceiptEffect::Unchanged(status) = effect {
                debug!(%tenant_id, backorder_id = %id, ?status, "backorder not open; left unchanged");
                report.applied.push((id, effect));
                continue;
            }

            match self.store.save(tenant_id, &backorder) {
                Ok(()) => report.applied.push((id, effect)),
                Err(e) => {
                    warn!(%tenant_id, backorder_id = %id, error = %e, "backorder save failed");
                    SubOperation::BackorderCascade.settle(id, e, &mut report.failed)?;
                }
            }
        }

        Ok(report)
    }
}

impl core::fmt::Debug for BackorderCascade {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackorderCascade").finish_non_exhaustive()
    }
}
