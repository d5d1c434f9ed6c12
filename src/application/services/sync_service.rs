use crate::application::ports::DeliveryRequest;
use crate::application::services::delivery_service::DeliveryPipeline;
use crate::application::services::queue_service::OperationQueue;
use crate::application::services::status_service::ConnectivityTracker;
use crate::domain::entities::DrainReport;
use crate::domain::value_objects::OperationStatus;
use crate::shared::error::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Progress callback: `(processed, total)` after each delivery attempt.
pub type ProgressCallback = dyn Fn(usize, usize) + Send + Sync;

/// Drains the durable operation queue through the full delivery path.
///
/// A drain pass is single-flight: the gate is `try_lock`ed, and a second
/// caller while one pass runs gets a coalesced report instead of a parallel
/// pass, which would double-deliver queued operations.
pub struct SyncEngine {
    queue: Arc<OperationQueue>,
    delivery: Arc<DeliveryPipeline>,
    tracker: Arc<ConnectivityTracker>,
    gate: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<OperationQueue>,
        delivery: Arc<DeliveryPipeline>,
        tracker: Arc<ConnectivityTracker>,
    ) -> Self {
        Self {
            queue,
            delivery,
            tracker,
            gate: Mutex::new(()),
        }
    }

    /// Entry point shared by every trigger source: connectivity-restored
    /// events, the periodic scheduler, and explicit background-sync requests.
    pub async fn request_sync(&self) -> Result<DrainReport> {
        self.drain(None).await
    }

    pub async fn drain(&self, progress: Option<&ProgressCallback>) -> Result<DrainReport> {
        let Ok(_guard) = self.gate.try_lock() else {
            tracing::debug!(target: "sync::engine", "drain already in progress, coalescing");
            return Ok(DrainReport::coalesced());
        };

        self.tracker.record_sync_attempt().await?;

        // The gate guarantees nothing is legitimately in flight, so an
        // operation persisted as processing was stranded by an interrupted
        // pass. Requeue it as failed before selection; otherwise it would
        // never be eligible again.
        let mut operations = self.queue.operations().await?;
        for operation in operations.iter_mut() {
            if operation.status == OperationStatus::Processing {
                tracing::warn!(
                    target: "sync::engine",
                    id = %operation.id,
                    "requeueing operation stranded in processing"
                );
                operation.mark_interrupted();
                self.queue.save(operation).await?;
            }
        }

        // High priority first, oldest first within a tier. Only pending and
        // failed operations are eligible; succeeded ones are skipped so
        // nothing confirmed is re-submitted.
        let mut operations: Vec<_> = operations
            .into_iter()
            .filter(|op| op.status.is_drainable())
            .collect();
        operations.sort_by(|a, b| {
            (a.priority.rank(), a.timestamp).cmp(&(b.priority.rank(), b.timestamp))
        });

        let total = operations.len();
        let mut report = DrainReport::default();

        for (index, mut operation) in operations.into_iter().enumerate() {
            operation.mark_processing();
            self.queue.save(&operation).await?;

            let request = DeliveryRequest {
                url: operation.url.clone(),
                method: operation.method,
                headers: operation.headers.clone(),
                body: operation.body.clone(),
            };

            match self.delivery.deliver(&request).await {
                Ok(_) => {
                    operation.mark_succeeded(Utc::now());
                    report.succeeded += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        target: "sync::engine",
                        id = %operation.id,
                        url = %operation.url,
                        error = %err,
                        "queued operation delivery failed"
                    );
                    operation.mark_failed(err.to_string(), Utc::now());
                    report.failed += 1;
                }
            }
            self.queue.save(&operation).await?;

            if let Some(callback) = progress {
                callback(index + 1, total);
            }
        }

        // Succeeded operations have served their purpose; purge them and
        // leave the failed remainder as the new backlog.
        for operation in self.queue.operations().await? {
            if operation.status == OperationStatus::Succeeded {
                self.queue.remove(&operation.id).await?;
            }
        }
        let backlog = self.queue.refresh_pending_count().await?;

        if report.failed == 0 {
            self.tracker.record_sync_completion().await?;
        }
        tracing::info!(
            target: "sync::engine",
            succeeded = report.succeeded,
            failed = report.failed,
            backlog,
            "drain pass finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{HttpTransport, TransportResponse};
    use crate::application::services::auth_refresh::AuthRefreshCoordinator;
    use crate::application::services::csrf_service::AntiForgeryTokenManager;
    use crate::domain::entities::OperationDraft;
    use crate::domain::value_objects::{HttpMethod, Priority};
    use crate::infrastructure::storage::MemoryDurableStore;
    use crate::shared::config::AppConfig;
    use crate::shared::error::AppError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::Mutex as AsyncMutex;

    /// Answers the csrf endpoint with a fixed token and records every other
    /// delivery, optionally with a scripted status per call.
    struct FakeServer {
        delivered: AsyncMutex<Vec<String>>,
        statuses: AsyncMutex<VecDeque<u16>>,
        delay: Duration,
    }

    impl FakeServer {
        fn new(statuses: Vec<u16>, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                delivered: AsyncMutex::new(Vec::new()),
                statuses: AsyncMutex::new(statuses.into()),
                delay: Duration::from_millis(delay_ms),
            })
        }

        async fn delivered(&self) -> Vec<String> {
            self.delivered.lock().await.clone()
        }
    }

    #[async_trait]
    impl HttpTransport for FakeServer {
        async fn execute(&self, request: &DeliveryRequest) -> Result<TransportResponse> {
            if request.url.ends_with("/csrf-token") {
                return Ok(TransportResponse {
                    status: 200,
                    body: Some(serde_json::json!({ "csrfToken": "token" })),
                });
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.delivered.lock().await.push(request.url.clone());
            let status = self.statuses.lock().await.pop_front().unwrap_or(200);
            if status == 0 {
                return Err(AppError::Network("connection refused".into()));
            }
            Ok(TransportResponse { status, body: None })
        }
    }

    struct Harness {
        engine: Arc<SyncEngine>,
        queue: Arc<OperationQueue>,
        tracker: Arc<ConnectivityTracker>,
        server: Arc<FakeServer>,
    }

    fn harness(statuses: Vec<u16>, delay_ms: u64) -> Harness {
        let store = Arc::new(MemoryDurableStore::new());
        let server = FakeServer::new(statuses, delay_ms);
        let api = AppConfig::default().api;
        let csrf = Arc::new(AntiForgeryTokenManager::new(
            server.clone(),
            api.csrf_endpoint.clone(),
        ));
        let auth = Arc::new(AuthRefreshCoordinator::new(
            server.clone(),
            api.refresh_endpoint.clone(),
        ));
        let delivery = Arc::new(DeliveryPipeline::new(
            server.clone(),
            csrf,
            auth,
            &api,
        ));
        let queue = Arc::new(OperationQueue::new(store.clone()));
        let tracker = Arc::new(ConnectivityTracker::new(store));
        let engine = Arc::new(SyncEngine::new(queue.clone(), delivery, tracker.clone()));
        Harness {
            engine,
            queue,
            tracker,
            server,
        }
    }

    fn draft(url: &str, priority: Priority) -> OperationDraft {
        OperationDraft::new(url, HttpMethod::Post).with_priority(priority)
    }

    #[tokio::test]
    async fn drain_orders_by_priority_then_timestamp() {
        let h = harness(vec![], 0);
        for (url, priority) in [
            ("/api/low", Priority::Low),
            ("/api/high-first", Priority::High),
            ("/api/medium", Priority::Medium),
            ("/api/high-second", Priority::High),
        ] {
            h.queue.enqueue(draft(url, priority)).await.unwrap();
        }

        let report = h.engine.drain(None).await.unwrap();
        assert_eq!(report.succeeded, 4);
        assert_eq!(
            h.server.delivered().await,
            vec![
                "/api/high-first",
                "/api/high-second",
                "/api/medium",
                "/api/low"
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_drains_deliver_each_operation_at_most_once() {
        let h = harness(vec![], 30);
        for i in 0..3 {
            h.queue
                .enqueue(draft(&format!("/api/op-{i}"), Priority::Medium))
                .await
                .unwrap();
        }

        let first = {
            let engine = h.engine.clone();
            tokio::spawn(async move { engine.drain(None).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = h.engine.drain(None).await.unwrap();

        assert!(second.already_running);
        assert_eq!(second.processed(), 0);

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.succeeded, 3);
        assert_eq!(h.server.delivered().await.len(), 3);
    }

    #[tokio::test]
    async fn failed_operations_stay_eligible_for_the_next_pass() {
        let h = harness(vec![500], 0);
        let op = h
            .queue
            .enqueue(draft("/api/widgets", Priority::Medium))
            .await
            .unwrap();

        let report = h.engine.drain(None).await.unwrap();
        assert_eq!(report.failed, 1);

        let stored = h.queue.get(&op.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OperationStatus::Failed);
        assert_eq!(stored.retry_count, 1);
        assert!(stored.error.as_deref().unwrap_or("").contains("500"));
        assert!(h.tracker.is_effectively_offline().await.unwrap());

        // Next pass succeeds and clears the backlog.
        let report = h.engine.drain(None).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert!(h.queue.get(&op.id).await.unwrap().is_none());
        assert_eq!(h.tracker.pending_request_count().await.unwrap(), 0);
        assert!(!h.tracker.is_effectively_offline().await.unwrap());
    }

    #[tokio::test]
    async fn operation_stranded_in_processing_is_requeued_and_delivered() {
        let h = harness(vec![], 0);
        let mut op = h
            .queue
            .enqueue(draft("/api/widgets", Priority::Medium))
            .await
            .unwrap();
        // Simulate a pass that died between pickup and outcome recording.
        op.mark_processing();
        h.queue.save(&op).await.unwrap();

        let report = h.engine.drain(None).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(h.server.delivered().await, vec!["/api/widgets"]);
        assert!(h.queue.get(&op.id).await.unwrap().is_none());
        assert_eq!(h.tracker.pending_request_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn succeeded_operations_are_purged_and_counter_rewritten() {
        let h = harness(vec![], 0);
        h.queue
            .enqueue(draft("/api/widgets", Priority::Medium))
            .await
            .unwrap();
        assert_eq!(h.tracker.pending_request_count().await.unwrap(), 1);

        let report = h.engine.drain(None).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert!(h.queue.operations().await.unwrap().is_empty());
        assert_eq!(h.tracker.pending_request_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn progress_callback_reports_each_attempt() {
        let h = harness(vec![], 0);
        for i in 0..3 {
            h.queue
                .enqueue(draft(&format!("/api/op-{i}"), Priority::Medium))
                .await
                .unwrap();
        }

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback = move |processed: usize, total: usize| {
            sink.lock().unwrap().push((processed, total));
        };
        h.engine.drain(Some(&callback)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }
}
