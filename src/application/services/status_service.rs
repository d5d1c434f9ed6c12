use crate::application::ports::{ConnectivityObserver, DurableStore};
use crate::application::services::queue_service::PENDING_COUNT_KEY;
use crate::domain::value_objects::StoreRegion;
use crate::shared::error::Result;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub const LAST_ONLINE_KEY: &str = "last_online_timestamp";
pub const LAST_SYNC_ATTEMPT_KEY: &str = "last_sync_attempt";
pub const LAST_SYNC_COMPLETION_KEY: &str = "last_sync_completion";

/// Aggregates raw platform connectivity signals with queue depth and recent
/// sync history into a single "effectively offline" verdict.
///
/// Trigger sources are decoupled through [`ConnectivityObserver`]: the
/// platform feeds `set_online`, and subscribers (the sync scheduler) react to
/// transitions without the tracker knowing about them.
pub struct ConnectivityTracker {
    store: Arc<dyn DurableStore>,
    online: AtomicBool,
    observers: Mutex<Vec<Arc<dyn ConnectivityObserver>>>,
}

impl ConnectivityTracker {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            // Assume online until the platform says otherwise, matching the
            // browser's navigator.onLine startup default.
            online: AtomicBool::new(true),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn ConnectivityObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Feeds a raw platform online/offline signal. Observers are notified on
    /// transitions only; the online timestamp is persisted when connectivity
    /// returns.
    pub async fn set_online(&self, online: bool) -> Result<()> {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return Ok(());
        }

        if online {
            self.write_timestamp(LAST_ONLINE_KEY, Utc::now()).await?;
        }
        tracing::info!(target: "sync::status", online, "connectivity changed");

        // The list is push-and-clone only, so a poisoned lock still holds a
        // usable value; recover it instead of panicking.
        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.connectivity_changed(online);
        }
        Ok(())
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Raw connectivity plus backlog state: the device is effectively offline
    /// when the link is down, or when a backlog exists and the most recent
    /// sync attempt has not completed. The comparison uses locally stored
    /// wall-clock timestamps, as the original behavior does.
    pub async fn is_effectively_offline(&self) -> Result<bool> {
        if !self.is_online() {
            return Ok(true);
        }
        let backlog = self.pending_request_count().await?;
        if backlog == 0 {
            return Ok(false);
        }
        let attempt = self.read_timestamp(LAST_SYNC_ATTEMPT_KEY).await?;
        let completion = self.read_timestamp(LAST_SYNC_COMPLETION_KEY).await?;
        Ok(match (attempt, completion) {
            (Some(attempt), Some(completion)) => attempt > completion,
            (Some(_), None) => true,
            _ => false,
        })
    }

    pub async fn pending_request_count(&self) -> Result<u32> {
        let value = self
            .store
            .get(StoreRegion::Metadata, PENDING_COUNT_KEY)
            .await?;
        Ok(value.and_then(|v| v.as_u64()).unwrap_or(0) as u32)
    }

    pub async fn last_online_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        self.read_timestamp(LAST_ONLINE_KEY).await
    }

    pub async fn record_sync_attempt(&self) -> Result<()> {
        self.write_timestamp(LAST_SYNC_ATTEMPT_KEY, Utc::now()).await
    }

    pub async fn record_sync_completion(&self) -> Result<()> {
        self.write_timestamp(LAST_SYNC_COMPLETION_KEY, Utc::now())
            .await
    }

    async fn write_timestamp(&self, key: &str, value: DateTime<Utc>) -> Result<()> {
        self.store
            .set(
                StoreRegion::Metadata,
                key,
                serde_json::json!(value.timestamp_millis()),
            )
            .await
    }

    async fn read_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let value = self.store.get(StoreRegion::Metadata, key).await?;
        Ok(value
            .and_then(|v| v.as_i64())
            .and_then(DateTime::from_timestamp_millis))
    }
}
