use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dockyard_core::{AggregateId, DomainError, Entity, TenantId};

dockyard_core::typed_id!(
    /// Inventory item identifier.
    InventoryItemId
);

dockyard_core::typed_id!(
    /// Ledger record identifier. Movements are written once under this id.
    MovementId
);

/// What a movement did to stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementAction {
    /// Goods arrived against a purchase order line.
    Receive,
    /// Goods left stock.
    Issue,
    /// Manual correction.
    Adjust,
}

impl MovementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementAction::Receive => "receive",
            MovementAction::Issue => "issue",
            MovementAction::Adjust => "adjust",
        }
    }
}

impl core::str::FromStr for MovementAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receive" => Ok(MovementAction::Receive),
            "issue" => Ok(MovementAction::Issue),
            "adjust" => Ok(MovementAction::Adjust),
            other => Err(DomainError::validation(format!("unknown movement action '{other}'"))),
        }
    }
}

/// Immutable inventory movement.
///
/// `ref_id` is the document that caused the movement (the purchase order for
/// receipts) and `line_ref` the line on that document. Movements are never
/// updated or deleted; quantities elsewhere are derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub action: MovementAction,
    pub qty: i64,
    pub ref_id: AggregateId,
    pub line_ref: Option<AggregateId>,
    pub lot: Option<String>,
    pub location_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// Build a `receive` movement for a purchase order line.
    ///
    /// Receipts always carry a positive quantity.
    pub fn receive(
        tenant_id: TenantId,
        item_id: InventoryItemId,
        qty: i64,
        ref_id: AggregateId,
        line_ref: AggregateId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if qty <= 0 {
            return Err(DomainError::validation("receipt quantity must be positive"));
        }

        Ok(Self {
            id: MovementId::generate(),
            tenant_id,
            item_id,
            action: MovementAction::Receive,
            qty,
            ref_id,
            line_ref: Some(line_ref),
            lot: None,
            location_id: None,
            created_at,
        })
    }

    pub fn with_lot(mut self, lot: Option<String>) -> Self {
        self.lot = lot;
        self
    }

    pub fn with_location(mut self, location_id: Option<String>) -> Self {
        self.location_id = location_id;
        self
    }

    pub fn is_receipt(&self) -> bool {
        self.action == MovementAction::Receive
    }
}

impl Entity for InventoryMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
