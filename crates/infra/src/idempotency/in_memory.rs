use std::collections::HashMap;
use std::sync::RwLock;

use dockyard_core::{AggregateId, TenantId};

use super::{IdempotencyKind, IdempotencyRecord, IdempotencyStore, IdempotencyStoreError};

type RecordKey = (TenantId, String, AggregateId, IdempotencyKind, String);

/// In-memory idempotency store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    records: RwLock<HashMap<RecordKey, IdempotencyRecord>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> IdempotencyStoreError {
    IdempotencyStoreError::Backend("lock poisoned".to_string())
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn find(
        &self,
        tenant_id: TenantId,
        scope: &str,
        ref_id: AggregateId,
        kind: IdempotencyKind,
        value: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let key = (tenant_id, scope.to_string(), ref_id, kind, value.to_string());
        Ok(records.get(&key).cloned())
    }

    fn insert_if_absent(&self, record: IdempotencyRecord) -> Result<bool, IdempotencyStoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let key = (
            record.tenant_id,
            record.scope.clone(),
            record.ref_id,
            record.kind,
            record.value.clone(),
        );

        if records.contains_key(&key) {
            return Ok(false);
        }
        records.insert(key, record);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(tenant_id: TenantId, ref_id: AggregateId, response: i64) -> IdempotencyRecord {
        IdempotencyRecord {
            tenant_id,
            scope: "purchasing.receive".to_string(),
            ref_id,
            kind: IdempotencyKind::ExplicitKey,
            value: "K".to_string(),
            response: serde_json::json!(response),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_insert_wins() {
        let store = InMemoryIdempotencyStore::new();
        let (tenant_id, ref_id) = (TenantId::new(), AggregateId::new());

        assert!(store.insert_if_absent(record(tenant_id, ref_id, 1)).unwrap());
        assert!(!store.insert_if_absent(record(tenant_id, ref_id, 2)).unwrap());

        let found = store
            .find(tenant_id, "purchasing.receive", ref_id, IdempotencyKind::ExplicitKey, "K")
            .unwrap()
            .unwrap();
        assert_eq!(found.response, serde_json::json!(1));
    }

    #[test]
    fn records_are_scoped_by_tenant_ref_and_kind() {
        let store = InMemoryIdempotencyStore::new();
        let (tenant_id, ref_id) = (TenantId::new(), AggregateId::new());
        store.insert_if_absent(record(tenant_id, ref_id, 1)).unwrap();

        let scope = "purchasing.receive";
        assert!(store
            .find(TenantId::new(), scope, ref_id, IdempotencyKind::ExplicitKey, "K")
            .unwrap()
            .is_none());
        assert!(store
            .find(tenant_id, scope, AggregateId::new(), IdempotencyKind::ExplicitKey, "K")
            .unwrap()
            .is_none());
        assert!(store
            .find(tenant_id, scope, ref_id, IdempotencyKind::ContentSignature, "K")
            .unwrap()
            .is_none());
    }
}
