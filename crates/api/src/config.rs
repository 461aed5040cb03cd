//! API process configuration.

use tracing::warn;

use dockyard_infra::ReceivingConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: String,
    /// When set, the ledger and idempotency records are kept in Postgres.
    pub database_url: Option<String>,
    pub receiving: ReceivingConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            receiving: ReceivingConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let bind_addr = match std::env::var("BIND_ADDR") {
            Ok(addr) if addr.parse::<std::net::SocketAddr>().is_ok() => addr,
            Ok(addr) => {
                warn!(value = %addr, "BIND_ADDR is not a socket address; using {DEFAULT_BIND_ADDR}");
                DEFAULT_BIND_ADDR.to_string()
            }
            Err(_) => DEFAULT_BIND_ADDR.to_string(),
        };

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Self {
            bind_addr,
            database_url,
            receiving: ReceivingConfig::from_env(),
        }
    }
}
