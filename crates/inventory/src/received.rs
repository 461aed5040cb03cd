//! Received-so-far aggregation over ledger records.

use std::collections::BTreeMap;

use dockyard_core::AggregateId;

use crate::movement::InventoryMovement;

/// Cumulative received quantity per order line, derived from movements.
///
/// Only `receive` movements that reference `ref_id` and carry a line reference
/// are counted; anything else fed in is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedByLine {
    ref_id: AggregateId,
    totals: BTreeMap<AggregateId, i64>,
}

impl ReceivedByLine {
    pub fn new(ref_id: AggregateId) -> Self {
        Self {
            ref_id,
            totals: BTreeMap::new(),
        }
    }

    pub fn ref_id(&self) -> AggregateId {
        self.ref_id
    }

    /// Fold one movement into the totals.
    pub fn record(&mut self, movement: &InventoryMovement) {
        if !movement.is_receipt() || movement.ref_id != self.ref_id {
            return;
        }
        if let Some(line) = movement.line_ref {
            *self.totals.entry(line).or_insert(0) += movement.qty;
        }
    }

    pub fn record_all<'a>(&mut self, movements: impl IntoIterator<Item = &'a InventoryMovement>) {
        for m in movements {
            self.record(m);
        }
    }

    /// Received quantity for a line (zero when nothing was received).
    pub fn get(&self, line: AggregateId) -> i64 {
        self.totals.get(&line).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AggregateId, i64)> + '_ {
        self.totals.iter().map(|(k, v)| (*k, *v))
    }

    pub fn total(&self) -> i64 {
        self.totals.values().sum()
    }
}
