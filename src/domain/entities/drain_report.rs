use serde::{Deserialize, Serialize};

/// Outcome of one drain pass over the operation queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub succeeded: u32,
    pub failed: u32,
    /// True when the call was coalesced into an already-running drain and
    /// processed nothing itself.
    pub already_running: bool,
}

impl DrainReport {
    pub fn coalesced() -> Self {
        Self {
            already_running: true,
            ..Self::default()
        }
    }

    pub fn processed(&self) -> u32 {
        self.succeeded + self.failed
    }
}
