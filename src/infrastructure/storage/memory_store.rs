use crate::application::ports::DurableStore;
use crate::domain::value_objects::StoreRegion;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory [`DurableStore`], used by tests and as a fallback when no
/// database path is configured. Same region semantics as the SQLite store,
/// no durability.
#[derive(Default)]
pub struct MemoryDurableStore {
    regions: Mutex<HashMap<StoreRegion, HashMap<String, Value>>>,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn get(&self, region: StoreRegion, key: &str) -> Result<Option<Value>, AppError> {
        let regions = self.regions.lock().await;
        Ok(regions.get(&region).and_then(|r| r.get(key)).cloned())
    }

    async fn set(&self, region: StoreRegion, key: &str, value: Value) -> Result<(), AppError> {
        let mut regions = self.regions.lock().await;
        regions
            .entry(region)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, region: StoreRegion, key: &str) -> Result<(), AppError> {
        let mut regions = self.regions.lock().await;
        if let Some(entries) = regions.get_mut(&region) {
            entries.remove(key);
        }
        Ok(())
    }

    async fn entries(&self, region: StoreRegion) -> Result<Vec<(String, Value)>, AppError> {
        let regions = self.regions.lock().await;
        Ok(regions
            .get(&region)
            .map(|r| r.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn clear(&self, region: StoreRegion) -> Result<(), AppError> {
        let mut regions = self.regions.lock().await;
        regions.remove(&region);
        Ok(())
    }
}
