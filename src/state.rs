use crate::application::ports::{DurableStore, HttpTransport};
use crate::application::services::{
    AntiForgeryTokenManager, AuthRefreshCoordinator, CacheService, ConnectivityTracker,
    DeliveryPipeline, OperationQueue, RequestPipeline, SyncEngine,
};
use crate::infrastructure::http::ReqwestTransport;
use crate::infrastructure::jobs::SyncScheduler;
use crate::infrastructure::storage::SqliteDurableStore;
use crate::shared::config::AppConfig;
use crate::shared::error::{AppError, Result};
use crate::shared::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Fully wired service graph. `initialize` builds the production backends
/// (SQLite store, reqwest transport); `with_backends` takes injected ones and
/// is the seam integration tests use.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DurableStore>,
    pub queue: Arc<OperationQueue>,
    pub cache: Arc<CacheService>,
    pub csrf: Arc<AntiForgeryTokenManager>,
    pub auth: Arc<AuthRefreshCoordinator>,
    pub delivery: Arc<DeliveryPipeline>,
    pub tracker: Arc<ConnectivityTracker>,
    pub engine: Arc<SyncEngine>,
    pub scheduler: Arc<SyncScheduler>,
    pub pipeline: Arc<RequestPipeline>,
}

impl AppState {
    pub async fn initialize(config: AppConfig) -> Result<Self> {
        let store = SqliteDurableStore::connect(
            &config.database.url,
            config.database.max_connections,
        )
        .await?;
        let transport = ReqwestTransport::new(&config.api)?;
        Self::with_backends(config, Arc::new(store), Arc::new(transport))
    }

    pub fn with_backends(
        config: AppConfig,
        store: Arc<dyn DurableStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        config.validate().map_err(AppError::Validation)?;

        let csrf = Arc::new(AntiForgeryTokenManager::with_retry(
            transport.clone(),
            config.api.csrf_endpoint.clone(),
            RetryPolicy::new(
                config.retry.token_fetch_max_retries,
                Duration::from_millis(config.retry.token_fetch_base_delay_ms),
                Duration::from_millis(config.retry.max_delay_ms),
            ),
        ));
        let auth = Arc::new(AuthRefreshCoordinator::new(
            transport.clone(),
            config.api.refresh_endpoint.clone(),
        ));
        let delivery = Arc::new(DeliveryPipeline::new(
            transport,
            csrf.clone(),
            auth.clone(),
            &config.api,
        ));

        let queue = Arc::new(OperationQueue::new(store.clone()));
        let cache = Arc::new(CacheService::new(store.clone()));
        let tracker = Arc::new(ConnectivityTracker::new(store.clone()));
        let engine = Arc::new(SyncEngine::new(
            queue.clone(),
            delivery.clone(),
            tracker.clone(),
        ));
        let scheduler = Arc::new(SyncScheduler::new(engine.clone(), &config.sync));
        tracker.subscribe(scheduler.clone());

        let retry = RetryPolicy::new(
            config.retry.max_retries,
            Duration::from_millis(config.retry.initial_delay_ms),
            Duration::from_millis(config.retry.max_delay_ms),
        );
        let pipeline = Arc::new(RequestPipeline::new(
            queue.clone(),
            delivery.clone(),
            tracker.clone(),
            csrf.clone(),
            auth.clone(),
            retry,
        ));

        Ok(Self {
            config,
            store,
            queue,
            cache,
            csrf,
            auth,
            delivery,
            tracker,
            engine,
            scheduler,
            pipeline,
        })
    }
}
