//! Pagination for ledger scans.

use serde::{Deserialize, Serialize};

use dockyard_inventory::InventoryMovement;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Offset-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of movements to return.
    pub limit: u32,
    /// Offset into the ref's movements (0-based, insertion order).
    pub offset: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            offset: 0,
        }
    }

    pub fn next(&self, returned: usize) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + returned as u64,
        }
    }
}

/// One page of movements for a reference document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPage {
    pub movements: Vec<InventoryMovement>,
    /// Request for the following page, `None` once the scan is exhausted.
    pub next: Option<PageRequest>,
}
