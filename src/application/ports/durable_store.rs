use crate::domain::value_objects::StoreRegion;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// Key/value persistence partitioned into named regions over one physical
/// backing store.
///
/// Every operation may fail with `AppError::Persistence`; callers must treat
/// a failure as "not durably recorded" and must not assume partial writes.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, region: StoreRegion, key: &str) -> Result<Option<Value>, AppError>;
    async fn set(&self, region: StoreRegion, key: &str, value: Value) -> Result<(), AppError>;
    async fn remove(&self, region: StoreRegion, key: &str) -> Result<(), AppError>;
    /// Snapshot of every (key, value) pair in the region.
    async fn entries(&self, region: StoreRegion) -> Result<Vec<(String, Value)>, AppError>;
    async fn clear(&self, region: StoreRegion) -> Result<(), AppError>;
}
