use crate::application::ports::{DeliveryRequest, TransportResponse};
use crate::application::services::auth_refresh::AuthRefreshCoordinator;
use crate::application::services::csrf_service::AntiForgeryTokenManager;
use crate::application::services::delivery_service::DeliveryPipeline;
use crate::application::services::queue_service::OperationQueue;
use crate::application::services::status_service::ConnectivityTracker;
use crate::domain::entities::{OperationDraft, QueuedOperation};
use crate::shared::error::Result;
use crate::shared::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What happened to a submitted operation: delivered now, or durably queued
/// for a later drain.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Delivered(TransportResponse),
    Queued(QueuedOperation),
}

/// Caller-facing surface of the pipeline.
///
/// `enqueue_or_send` attempts immediate delivery while effectively online and
/// falls back to the durable queue when offline or when a retryable failure
/// survives the retry policy. Non-retryable failures are the caller's to
/// handle and are never queued.
pub struct RequestPipeline {
    queue: Arc<OperationQueue>,
    delivery: Arc<DeliveryPipeline>,
    tracker: Arc<ConnectivityTracker>,
    csrf: Arc<AntiForgeryTokenManager>,
    auth: Arc<AuthRefreshCoordinator>,
    retry: RetryPolicy,
}

impl RequestPipeline {
    pub fn new(
        queue: Arc<OperationQueue>,
        delivery: Arc<DeliveryPipeline>,
        tracker: Arc<ConnectivityTracker>,
        csrf: Arc<AntiForgeryTokenManager>,
        auth: Arc<AuthRefreshCoordinator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            queue,
            delivery,
            tracker,
            csrf,
            auth,
            retry,
        }
    }

    pub async fn enqueue_or_send(&self, draft: OperationDraft) -> Result<SendOutcome> {
        if self.tracker.is_effectively_offline().await? {
            tracing::debug!(
                target: "sync::pipeline",
                url = %draft.url,
                "effectively offline, queueing operation"
            );
            return Ok(SendOutcome::Queued(self.queue.enqueue(draft).await?));
        }

        let request = DeliveryRequest {
            url: draft.url.clone(),
            method: draft.method,
            headers: draft.headers.clone(),
            body: draft.body.clone(),
        };

        match self.retry.run(|| self.delivery.deliver(&request)).await {
            Ok(response) => Ok(SendOutcome::Delivered(response)),
            Err(err) if err.is_retryable() => {
                tracing::info!(
                    target: "sync::pipeline",
                    url = %request.url,
                    error = %err,
                    "delivery exhausted retries, queueing operation"
                );
                Ok(SendOutcome::Queued(self.queue.enqueue(draft).await?))
            }
            Err(err) => Err(err),
        }
    }

    /// Resets the in-memory token state so a stale session cannot leak into
    /// the next one. The durable queue is left intact.
    pub async fn logout(&self) {
        self.csrf.invalidate().await;
        self.auth.reset().await;
    }

    pub async fn pending_request_count(&self) -> Result<u32> {
        self.tracker.pending_request_count().await
    }

    pub async fn last_online_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        self.tracker.last_online_timestamp().await
    }

    pub async fn is_effectively_offline(&self) -> Result<bool> {
        self.tracker.is_effectively_offline().await
    }
}
