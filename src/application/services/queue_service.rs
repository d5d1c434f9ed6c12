use crate::application::ports::DurableStore;
use crate::domain::entities::{OperationDraft, QueuedOperation};
use crate::domain::value_objects::{OperationId, StoreRegion};
use crate::shared::error::Result;
use chrono::Utc;
use std::sync::Arc;

pub const PENDING_COUNT_KEY: &str = "pending_request_count";

/// Durable operation queue over the `operationQueue` region.
///
/// Enqueue is an idempotent upsert by operation id: re-enqueueing refreshes
/// the payload but preserves the lifecycle fields (status, retry count,
/// original timestamp) so an operation already picked up by a drain is never
/// reset into double delivery.
pub struct OperationQueue {
    store: Arc<dyn DurableStore>,
}

impl OperationQueue {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    pub async fn enqueue(&self, draft: OperationDraft) -> Result<QueuedOperation> {
        let existing = match &draft.id {
            Some(id) => self.get(id).await?,
            None => None,
        };

        let operation = match existing {
            Some(mut current) => {
                current.url = draft.url;
                current.method = draft.method;
                current.body = draft.body;
                current.headers = draft.headers;
                current.priority = draft.priority;
                current
            }
            None => QueuedOperation::from_draft(draft, Utc::now()),
        };

        self.save(&operation).await?;
        self.refresh_pending_count().await?;
        tracing::debug!(
            target: "sync::queue",
            id = %operation.id,
            url = %operation.url,
            priority = operation.priority.as_str(),
            "operation enqueued"
        );
        Ok(operation)
    }

    pub async fn get(&self, id: &OperationId) -> Result<Option<QueuedOperation>> {
        let value = self
            .store
            .get(StoreRegion::OperationQueue, id.as_str())
            .await?;
        value
            .map(|v| serde_json::from_value(v).map_err(Into::into))
            .transpose()
    }

    pub async fn operations(&self) -> Result<Vec<QueuedOperation>> {
        let entries = self.store.entries(StoreRegion::OperationQueue).await?;
        entries
            .into_iter()
            .map(|(_, value)| serde_json::from_value(value).map_err(Into::into))
            .collect()
    }

    /// Persists a status transition. The queue and the sync engine are the
    /// only writers of these transitions.
    pub async fn save(&self, operation: &QueuedOperation) -> Result<()> {
        let value = serde_json::to_value(operation)?;
        self.store
            .set(StoreRegion::OperationQueue, operation.id.as_str(), value)
            .await
    }

    pub async fn remove(&self, id: &OperationId) -> Result<()> {
        self.store
            .remove(StoreRegion::OperationQueue, id.as_str())
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear(StoreRegion::OperationQueue).await?;
        self.refresh_pending_count().await?;
        Ok(())
    }

    /// Backlog still awaiting delivery: pending plus failed.
    pub async fn pending_count(&self) -> Result<u32> {
        let operations = self.operations().await?;
        Ok(operations
            .iter()
            .filter(|op| op.status.is_drainable())
            .count() as u32)
    }

    /// Rewrites the persisted backlog counter from the queue contents.
    pub async fn refresh_pending_count(&self) -> Result<u32> {
        let count = self.pending_count().await?;
        self.store
            .set(
                StoreRegion::Metadata,
                PENDING_COUNT_KEY,
                serde_json::json!(count),
            )
            .await?;
        Ok(count)
    }
}
