//! Postgres-backed idempotency records.
//!
//! The composite primary key on `idempotency_records` makes
//! `insert_if_absent` a single `INSERT .. ON CONFLICT DO NOTHING`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use tracing::instrument;

use dockyard_core::{AggregateId, TenantId};

use super::{IdempotencyKind, IdempotencyRecord, IdempotencyStore, IdempotencyStoreError};
use crate::pg;

#[derive(Debug, Clone)]
pub struct PostgresIdempotencyStore {
    pool: Arc<PgPool>,
}

impl PostgresIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, ref_id = %ref_id, kind = %kind), err)]
    pub async fn fetch(
        &self,
        tenant_id: TenantId,
        scope: &str,
        ref_id: AggregateId,
        kind: IdempotencyKind,
        value: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError> {
        let row = sqlx::query(
            r#"
            SELECT response, created_at
            FROM idempotency_records
            WHERE tenant_id = $1 AND scope = $2 AND ref_id = $3 AND kind = $4 AND value = $5
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(scope)
        .bind(*ref_id.as_uuid())
        .bind(kind.as_str())
        .bind(value)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| IdempotencyStoreError::Backend(format!("query idempotency record: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let decode = |e: sqlx::Error| IdempotencyStoreError::Backend(format!("decode idempotency record: {e}"));
        let response: JsonValue = row.try_get("response").map_err(decode)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

        Ok(Some(IdempotencyRecord {
            tenant_id,
            scope: scope.to_string(),
            ref_id,
            kind,
            value: value.to_string(),
            response,
            created_at,
        }))
    }

    #[instrument(
        skip(self, record),
        fields(tenant_id = %record.tenant_id, ref_id = %record.ref_id, kind = %record.kind),
        err
    )]
    pub async fn insert(&self, record: &IdempotencyRecord) -> Result<bool, IdempotencyStoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency_records (tenant_id, scope, ref_id, kind, value, response, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tenant_id, scope, ref_id, kind, value) DO NOTHING
            "#,
        )
        .bind(*record.tenant_id.as_uuid())
        .bind(&record.scope)
        .bind(*record.ref_id.as_uuid())
        .bind(record.kind.as_str())
        .bind(&record.value)
        .bind(&record.response)
        .bind(record.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| IdempotencyStoreError::Backend(format!("insert idempotency record: {e}")))?;

        Ok(result.rows_affected() == 1)
    }
}

fn no_runtime() -> IdempotencyStoreError {
    IdempotencyStoreError::Backend(
        "PostgresIdempotencyStore requires a multi-threaded tokio runtime".to_string(),
    )
}

impl IdempotencyStore for PostgresIdempotencyStore {
    fn find(
        &self,
        tenant_id: TenantId,
        scope: &str,
        ref_id: AggregateId,
        kind: IdempotencyKind,
        value: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError> {
        pg::block_on(self.fetch(tenant_id, scope, ref_id, kind, value)).ok_or_else(no_runtime)?
    }

    fn insert_if_absent(&self, record: IdempotencyRecord) -> Result<bool, IdempotencyStoreError> {
        pg::block_on(self.insert(&record)).ok_or_else(no_runtime)?
    }
}
