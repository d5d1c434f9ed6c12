use serde::{Deserialize, Serialize};

/// Queue state machine:
/// pending --(picked up by drain)--> processing --(2xx)--> succeeded --(sweep)--> removed
/// processing --(non-2xx or transport error)--> failed --(next drain)--> processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Processing,
    Failed,
    Succeeded,
}

impl OperationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Processing => "processing",
            OperationStatus::Failed => "failed",
            OperationStatus::Succeeded => "succeeded",
        }
    }

    /// Only pending and failed operations are eligible for a drain pass;
    /// processing and succeeded ones must never be re-submitted.
    pub fn is_drainable(&self) -> bool {
        matches!(self, OperationStatus::Pending | OperationStatus::Failed)
    }
}
