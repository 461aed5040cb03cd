//! Postgres-backed movement ledger.
//!
//! Movements live in `inventory_movements` (see `migrations/`). The primary key
//! on `movement_id` makes every insert write-once; scans page through
//! `(tenant_id, ref_id, seq)`.
//!
//! | SQLx error | Ledger error |
//! |------------|--------------------|
//! | unique violation (`23505`) | `LedgerError::Duplicate` |
//! | anything else | `LedgerError::Backend` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use dockyard_core::{AggregateId, TenantId};
use dockyard_inventory::{InventoryItemId, InventoryMovement, MovementAction, MovementId};

use super::query::{MovementPage, PageRequest};
use super::{LedgerError, MovementLedger};
use crate::pg;

#[derive(Debug, Clone)]
pub struct PostgresMovementLedger {
    pool: Arc<PgPool>,
}

impl PostgresMovementLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    #[instrument(
        skip(self, movement),
        fields(tenant_id = %movement.tenant_id, movement_id = %movement.id),
        err
    )]
    pub async fn insert(&self, movement: &InventoryMovement) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                movement_id, tenant_id, item_id, action, qty,
                ref_id, line_ref, lot, location_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(*movement.id.0.as_uuid())
        .bind(*movement.tenant_id.as_uuid())
        .bind(*movement.item_id.0.as_uuid())
        .bind(movement.action.as_str())
        .bind(movement.qty)
        .bind(*movement.ref_id.as_uuid())
        .bind(movement.line_ref.map(|id| *id.as_uuid()))
        .bind(movement.lot.as_deref())
        .bind(movement.location_id.as_deref())
        .bind(movement.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if pg::is_unique_violation(&e) {
                LedgerError::Duplicate(movement.id)
            } else {
                LedgerError::Backend(format!("insert movement: {e}"))
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, ref_id = %ref_id), err)]
    pub async fn fetch_page(
        &self,
        tenant_id: TenantId,
        ref_id: AggregateId,
        page: PageRequest,
    ) -> Result<MovementPage, LedgerError> {
        // One extra row tells us whether another page exists.
        let rows = sqlx::query(
            r#"
            SELECT movement_id, tenant_id, item_id, action, qty,
                   ref_id, line_ref, lot, location_id, created_at
            FROM inventory_movements
            WHERE tenant_id = $1 AND ref_id = $2
            ORDER BY seq ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*ref_id.as_uuid())
        .bind(i64::from(page.limit) + 1)
        .bind(page.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| LedgerError::Backend(format!("query movements: {e}")))?;

        let has_more = rows.len() > page.limit as usize;
        let movements = rows
            .iter()
            .take(page.limit as usize)
            .map(movement_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let next = has_more.then(|| page.next(movements.len()));
        Ok(MovementPage { movements, next })
    }
}

fn movement_from_row(row: &sqlx::postgres::PgRow) -> Result<InventoryMovement, LedgerError> {
    let decode = |e: sqlx::Error| LedgerError::Backend(format!("decode movement row: {e}"));

    let action: String = row.try_get("action").map_err(decode)?;
    let action: MovementAction = action
        .parse()
        .map_err(|e| LedgerError::Backend(format!("decode movement row: {e}")))?;
    let line_ref: Option<Uuid> = row.try_get("line_ref").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

    Ok(InventoryMovement {
        id: MovementId::new(AggregateId::from_uuid(row.try_get("movement_id").map_err(decode)?)),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(decode)?),
        item_id: InventoryItemId::new(AggregateId::from_uuid(row.try_get("item_id").map_err(decode)?)),
        action,
        qty: row.try_get("qty").map_err(decode)?,
        ref_id: AggregateId::from_uuid(row.try_get("ref_id").map_err(decode)?),
        line_ref: line_ref.map(AggregateId::from_uuid),
        lot: row.try_get("lot").map_err(decode)?,
        location_id: row.try_get("location_id").map_err(decode)?,
        created_at,
    })
}

fn no_runtime() -> LedgerError {
    LedgerError::Backend("PostgresMovementLedger requires a multi-threaded tokio runtime".to_string())
}

impl MovementLedger for PostgresMovementLedger {
    fn append(&self, movement: InventoryMovement) -> Result<(), LedgerError> {
        pg::block_on(self.insert(&movement)).ok_or_else(no_runtime)?
    }

    fn query_by_ref(
        &self,
        tenant_id: TenantId,
        ref_id: AggregateId,
        page: PageRequest,
    ) -> Result<MovementPage, LedgerError> {
        pg::block_on(self.fetch_page(tenant_id, ref_id, page)).ok_or_else(no_runtime)?
    }
}
