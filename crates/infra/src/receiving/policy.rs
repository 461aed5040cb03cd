//! What receiving does when a sub-operation fails after validation.
//!
//! | Sub-operation | Policy |
//! |---------------|--------|
//! | ledger append (per line) | continue |
//! | backorder cascade (per backorder) | continue |
//! | order save | abort |
//! | idempotency mark | continue |
//! | event emission (per event) | continue |

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubOperation {
    LedgerAppend,
    BackorderCascade,
    OrderSave,
    MarkApplied,
    EventEmission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log, record a [`SkippedStep`], carry on with the receipt.
    Continue,
    /// Fail the request.
    Abort,
}

impl SubOperation {
    pub fn policy(&self) -> FailurePolicy {
        match self {
            SubOperation::OrderSave => FailurePolicy::Abort,
            SubOperation::LedgerAppend
            | SubOperation::BackorderCascade
            | SubOperation::MarkApplied
            | SubOperation::EventEmission => FailurePolicy::Continue,
        }
    }

    /// Apply the table to a failure of this sub-operation.
    ///
    /// `Continue` records a [`SkippedStep`] for `target` and returns `Ok`;
    /// `Abort` hands the error back to be propagated.
    pub fn settle<E: core::fmt::Display>(
        self,
        target: impl ToString,
        err: E,
        skipped: &mut Vec<SkippedStep>,
    ) -> Result<(), E> {
        match self.policy() {
            FailurePolicy::Continue => {
                skipped.push(SkippedStep::new(self, target, &err));
                Ok(())
            }
            FailurePolicy::Abort => Err(err),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubOperation::LedgerAppend => "ledger-append",
            SubOperation::BackorderCascade => "backorder-cascade",
            SubOperation::OrderSave => "order-save",
            SubOperation::MarkApplied => "mark-applied",
            SubOperation::EventEmission => "event-emission",
        }
    }
}

impl core::fmt::Display for SubOperation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A best-effort sub-operation that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedStep {
    pub operation: SubOperation,
    /// Id of the line, backorder or event that was skipped.
    pub target: String,
    pub reason: String,
}

impl SkippedStep {
    pub fn new(operation: SubOperation, target: impl ToString, reason: impl ToString) -> Self {
        Self {
            operation,
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }
}
