use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical namespace inside the shared durable store. The queue owns
/// `OperationQueue`, the cache service owns `DataCache`; `Metadata` holds the
/// scalar counters and timestamps written by the queue (backlog size) and the
/// connectivity tracker (online/sync timestamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreRegion {
    OperationQueue,
    DataCache,
    Metadata,
}

impl StoreRegion {
    pub fn as_str(&self) -> &str {
        match self {
            StoreRegion::OperationQueue => "operationQueue",
            StoreRegion::DataCache => "dataCache",
            StoreRegion::Metadata => "metadata",
        }
    }
}

impl fmt::Display for StoreRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
