//! Service wiring: stores, ledger, idempotency and the receiving workflow.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use dockyard_events::{EventEnvelope, InMemoryEventBus};
use dockyard_infra::idempotency::{IdempotencyStore, InMemoryIdempotencyStore, PostgresIdempotencyStore};
use dockyard_infra::ledger::{InMemoryMovementLedger, MovementLedger, PostgresMovementLedger};
use dockyard_infra::notifier::{BusNotifier, EventNotifier, NoopNotifier};
use dockyard_infra::pg;
use dockyard_infra::store::{InMemoryBackorderStore, InMemoryOrderStore, InMemoryPartyDirectory};
use dockyard_infra::{ReceivingConfig, ReceivingPorts, ReceivingWorkflow};

use crate::config::ApiConfig;

pub type NotificationBus = Arc<InMemoryEventBus<EventEnvelope>>;

/// Document stores behind the workflow.
///
/// Orders, backorders and parties are owned by other parts of the system; the
/// API keeps in-memory copies that callers (and tests) seed directly.
#[derive(Clone, Default)]
pub struct DocumentStores {
    pub orders: Arc<InMemoryOrderStore>,
    pub backorders: Arc<InMemoryBackorderStore>,
    pub parties: Arc<InMemoryPartyDirectory>,
}

pub struct AppServices {
    pub receiving: ReceivingWorkflow,
    pub documents: DocumentStores,
    pub bus: NotificationBus,
}

impl AppServices {
    fn wire(
        documents: DocumentStores,
        ledger: Arc<dyn MovementLedger>,
        idempotency: Arc<dyn IdempotencyStore>,
        config: ReceivingConfig,
    ) -> Self {
        let bus: NotificationBus = Arc::new(InMemoryEventBus::new());
        let notifier: Arc<dyn EventNotifier> = if config.emit_events {
            Arc::new(BusNotifier::new(bus.clone()))
        } else {
            info!("RECEIVING_EMIT_EVENTS is off; receiving events are dropped");
            Arc::new(NoopNotifier)
        };
        let ports = ReceivingPorts {
            orders: documents.orders.clone(),
            backorders: documents.backorders.clone(),
            parties: documents.parties.clone(),
            ledger,
            idempotency,
            notifier,
        };

        Self {
            receiving: ReceivingWorkflow::new(ports, config),
            documents,
            bus,
        }
    }

    /// Everything in memory (dev/test).
    pub fn in_memory(config: ReceivingConfig) -> Self {
        Self::wire(
            DocumentStores::default(),
            Arc::new(InMemoryMovementLedger::new()),
            Arc::new(InMemoryIdempotencyStore::new()),
            config,
        )
    }

    /// Ledger and idempotency records in Postgres.
    pub fn postgres(pool: PgPool, config: ReceivingConfig) -> Self {
        Self::wire(
            DocumentStores::default(),
            Arc::new(PostgresMovementLedger::new(pool.clone())),
            Arc::new(PostgresIdempotencyStore::new(pool)),
            config,
        )
    }
}

pub async fn build_services(config: &ApiConfig) -> Result<Arc<AppServices>, sqlx::Error> {
    let services = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url).await?;
            pg::apply_migrations(&pool).await?;
            info!("receiving ledger and idempotency records stored in postgres");
            AppServices::postgres(pool, config.receiving.clone())
        }
        None => {
            info!("DATABASE_URL not set; using in-memory stores");
            AppServices::in_memory(config.receiving.clone())
        }
    };

    Ok(Arc::new(services))
}
