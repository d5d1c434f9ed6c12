use crate::application::ports::DurableStore;
use crate::domain::entities::CachedEntry;
use crate::domain::value_objects::StoreRegion;
use crate::shared::error::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Cached responses over the `dataCache` region. Expired entries are
/// logically absent: purged on the read that notices them, and by the
/// periodic `cleanup_expired` sweep.
pub struct CacheService {
    store: Arc<dyn DurableStore>,
}

impl CacheService {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    pub async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<CachedEntry> {
        let now = Utc::now();
        let entry = CachedEntry::new(key.to_string(), value, now, ttl.map(|ttl| now + ttl));
        self.store
            .set(StoreRegion::DataCache, key, serde_json::to_value(&entry)?)
            .await?;
        Ok(entry)
    }

    pub async fn get(&self, key: &str) -> Result<Option<CachedEntry>> {
        let Some(value) = self.store.get(StoreRegion::DataCache, key).await? else {
            return Ok(None);
        };
        let entry: CachedEntry = serde_json::from_value(value)?;
        if entry.is_expired(Utc::now()) {
            self.store.remove(StoreRegion::DataCache, key).await?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(StoreRegion::DataCache, key).await
    }

    /// Sweeps every expired entry; returns how many were removed.
    pub async fn cleanup_expired(&self) -> Result<u32> {
        let now = Utc::now();
        let mut removed = 0;
        for (key, value) in self.store.entries(StoreRegion::DataCache).await? {
            let entry: CachedEntry = serde_json::from_value(value)?;
            if entry.is_expired(now) {
                self.store.remove(StoreRegion::DataCache, &key).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear(StoreRegion::DataCache).await
    }
}
