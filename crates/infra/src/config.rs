//! Receiving configuration from the environment.

use tracing::warn;

use crate::ledger::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const DEFAULT_IDEMPOTENCY_SCOPE: &str = "purchasing.receive";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivingConfig {
    /// Reject receipts unless the order references an active vendor.
    pub require_vendor: bool,
    /// Page size for ledger scans, `1..=MAX_PAGE_SIZE`.
    pub ledger_page_size: u32,
    pub idempotency_scope: String,
    /// Publish receiving events. When off, events are dropped by a no-op notifier.
    pub emit_events: bool,
}

impl Default for ReceivingConfig {
    fn default() -> Self {
        Self {
            require_vendor: true,
            ledger_page_size: DEFAULT_PAGE_SIZE,
            idempotency_scope: DEFAULT_IDEMPOTENCY_SCOPE.to_string(),
            emit_events: true,
        }
    }
}

impl ReceivingConfig {
    /// Read `RECEIVING_*` variables. Malformed values are logged and replaced
    /// by defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let require_vendor = match lookup("RECEIVING_REQUIRE_VENDOR") {
            None => defaults.require_vendor,
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "RECEIVING_REQUIRE_VENDOR is not a boolean; using default");
                defaults.require_vendor
            }),
        };

        let emit_events = match lookup("RECEIVING_EMIT_EVENTS") {
            None => defaults.emit_events,
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "RECEIVING_EMIT_EVENTS is not a boolean; using default");
                defaults.emit_events
            }),
        };

        let ledger_page_size = match lookup("RECEIVING_LEDGER_PAGE_SIZE") {
            None => defaults.ledger_page_size,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(0) | Err(_) => {
                    warn!(value = %raw, "RECEIVING_LEDGER_PAGE_SIZE is not a positive integer; using default");
                    defaults.ledger_page_size
                }
                Ok(n) if n > MAX_PAGE_SIZE => {
                    warn!(value = n, max = MAX_PAGE_SIZE, "RECEIVING_LEDGER_PAGE_SIZE capped");
                    MAX_PAGE_SIZE
                }
                Ok(n) => n,
            },
        };

        let idempotency_scope = lookup("RECEIVING_IDEMPOTENCY_SCOPE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.idempotency_scope);

        Self {
            require_vendor,
            ledger_page_size,
            idempotency_scope,
            emit_events,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
