pub mod auth_refresh;
pub mod cache_service;
pub mod csrf_service;
pub mod delivery_service;
pub mod queue_service;
pub mod request_pipeline;
pub mod status_service;
pub mod sync_service;

pub use auth_refresh::AuthRefreshCoordinator;
pub use cache_service::CacheService;
pub use csrf_service::AntiForgeryTokenManager;
pub use delivery_service::DeliveryPipeline;
pub use queue_service::OperationQueue;
pub use request_pipeline::{RequestPipeline, SendOutcome};
pub use status_service::ConnectivityTracker;
pub use sync_service::{ProgressCallback, SyncEngine};
