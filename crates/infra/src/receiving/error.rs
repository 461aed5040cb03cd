use serde::{Deserialize, Serialize};
use thiserror::Error;

use dockyard_purchasing::{PurchaseOrderId, ReceiptRejection, ReceiveShortfall};

use crate::idempotency::IdempotencyStoreError;
use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Machine-readable reason carried by every [`ReceiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiveErrorCode {
    OrderNotFound,
    LinesRequired,
    InvalidDelta,
    UnknownLine,
    VendorRequired,
    VendorNotFound,
    VendorRoleRequired,
    VendorInactive,
    OrderNotReceivable,
    ReceiveExceedsRemaining,
    Internal,
}

impl ReceiveErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiveErrorCode::OrderNotFound => "ORDER_NOT_FOUND",
            ReceiveErrorCode::LinesRequired => "LINES_REQUIRED",
            ReceiveErrorCode::InvalidDelta => "INVALID_DELTA",
            ReceiveErrorCode::UnknownLine => "UNKNOWN_LINE",
            ReceiveErrorCode::VendorRequired => "VENDOR_REQUIRED",
            ReceiveErrorCode::VendorNotFound => "VENDOR_NOT_FOUND",
            ReceiveErrorCode::VendorRoleRequired => "VENDOR_ROLE_REQUIRED",
            ReceiveErrorCode::VendorInactive => "VENDOR_INACTIVE",
            ReceiveErrorCode::OrderNotReceivable => "ORDER_NOT_RECEIVABLE",
            ReceiveErrorCode::ReceiveExceedsRemaining => "RECEIVE_EXCEEDS_REMAINING",
            ReceiveErrorCode::Internal => "INTERNAL",
        }
    }
}

impl core::fmt::Display for ReceiveErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiving failure, one variant per response class.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiveError {
    #[error("purchase order {0} not found")]
    OrderNotFound(PurchaseOrderId),

    #[error("{code}: {message}")]
    InvalidInput {
        code: ReceiveErrorCode,
        message: String,
        field: Option<String>,
    },

    #[error("{code}: {message}")]
    Conflict {
        code: ReceiveErrorCode,
        message: String,
        shortfall: Option<ReceiveShortfall>,
    },

    /// Unexpected store failure. Never retried here.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReceiveError {
    pub fn invalid(code: ReceiveErrorCode, message: impl Into<String>, field: impl Into<String>) -> Self {
        ReceiveError::InvalidInput {
            code,
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn code(&self) -> ReceiveErrorCode {
        match self {
            ReceiveError::OrderNotFound(_) => ReceiveErrorCode::OrderNotFound,
            ReceiveError::InvalidInput { code, .. } | ReceiveError::Conflict { code, .. } => *code,
            ReceiveError::Internal(_) => ReceiveErrorCode::Internal,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ReceiveError::OrderNotFound(_) => 404,
            ReceiveError::InvalidInput { .. } => 400,
            ReceiveError::Conflict { .. } => 409,
            ReceiveError::Internal(_) => 500,
        }
    }
}

impl From<ReceiptRejection> for ReceiveError {
    fn from(value: ReceiptRejection) -> Self {
        match value {
            ReceiptRejection::LinesRequired => ReceiveError::invalid(
                ReceiveErrorCode::LinesRequired,
                "at least one receipt line is required",
                "lines",
            ),
            ReceiptRejection::UnknownLine(line_ref) => ReceiveError::invalid(
                ReceiveErrorCode::UnknownLine,
                format!("line '{line_ref}' is not on this purchase order"),
                "lines.lineRef",
            ),
            ReceiptRejection::InvalidDelta { line_ref, delta } => ReceiveError::invalid(
                ReceiveErrorCode::InvalidDelta,
                format!("delta for line '{line_ref}' must be positive, got {delta}"),
                "lines.deltaQty",
            ),
            ReceiptRejection::ExceedsRemaining(shortfall) => ReceiveError::Conflict {
                code: ReceiveErrorCode::ReceiveExceedsRemaining,
                message: format!(
                    "line {} has {} remaining; cannot receive {}",
                    shortfall.line_id, shortfall.remaining, shortfall.attempted_delta
                ),
                shortfall: Some(shortfall),
            },
        }
    }
}

impl From<StoreError> for ReceiveError {
    fn from(value: StoreError) -> Self {
        ReceiveError::Internal(value.to_string())
    }
}

impl From<LedgerError> for ReceiveError {
    fn from(value: LedgerError) -> Self {
        ReceiveError::Internal(value.to_string())
    }
}

impl From<IdempotencyStoreError> for ReceiveError {
    fn from(value: IdempotencyStoreError) -> Self {
        ReceiveError::Internal(value.to_string())
    }
}
