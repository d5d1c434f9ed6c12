use crate::application::ports::{DeliveryRequest, HttpTransport};
use crate::domain::value_objects::HttpMethod;
use crate::shared::error::{AppError, Result};
use crate::shared::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// In-memory anti-forgery token cache with a single-flight fetch.
///
/// The token lives only in this process: it is short-lived, re-derivable, and
/// never written to the durable store. The async mutex is held across the
/// network fetch, so concurrent `get_token` callers coalesce onto one request
/// and all observe the same cached value once it resolves.
pub struct AntiForgeryTokenManager {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    retry: RetryPolicy,
    token: Mutex<Option<String>>,
}

impl AntiForgeryTokenManager {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: String) -> Self {
        // Token fetches are short: 3 attempts, 500ms base delay, 10s cap.
        Self::with_retry(
            transport,
            endpoint,
            RetryPolicy::new(3, Duration::from_millis(500), Duration::from_millis(10_000)),
        )
    }

    pub fn with_retry(
        transport: Arc<dyn HttpTransport>,
        endpoint: String,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            endpoint,
            retry,
            token: Mutex::new(None),
        }
    }

    /// Returns the cached token, fetching it first if necessary.
    pub async fn get_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        let fetched = self.fetch_token().await?;
        *guard = Some(fetched.clone());
        Ok(fetched)
    }

    /// Drops the cached token. Called on logout and when the server reports
    /// the token as invalid.
    pub async fn invalidate(&self) {
        let mut guard = self.token.lock().await;
        *guard = None;
    }

    /// Invalidate-and-refetch, used by the one-shot recovery after a
    /// delivery-time token rejection.
    pub async fn refresh(&self) -> Result<String> {
        self.invalidate().await;
        self.get_token().await
    }

    async fn fetch_token(&self) -> Result<String> {
        let request = DeliveryRequest::new(self.endpoint.clone(), HttpMethod::Get);
        self.retry
            .run(|| async {
                let response = self.transport.execute(&request).await?;
                if let Some(err) = response.error_for_status() {
                    return Err(err);
                }
                response
                    .body_str("csrfToken")
                    .map(str::to_string)
                    .ok_or_else(|| {
                        AppError::Server("csrf endpoint returned no csrfToken field".to_string())
                    })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TransportResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingTransport {
        fetches: AtomicU32,
        fail_first: u32,
    }

    impl CountingTransport {
        fn new(fail_first: u32) -> Arc<Self> {
            Arc::new(Self {
                fetches: AtomicU32::new(0),
                fail_first,
            })
        }
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn execute(&self, _request: &DeliveryRequest) -> Result<TransportResponse> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            // Hold the request open long enough for callers to pile up.
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n < self.fail_first {
                return Err(AppError::Network("connection reset".into()));
            }
            Ok(TransportResponse {
                status: 200,
                body: Some(serde_json::json!({ "csrfToken": format!("token-{n}") })),
            })
        }
    }

    fn manager(transport: Arc<CountingTransport>) -> Arc<AntiForgeryTokenManager> {
        Arc::new(AntiForgeryTokenManager::with_retry(
            transport,
            "/api/csrf-token".to_string(),
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2)),
        ))
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let transport = CountingTransport::new(0);
        let manager = manager(transport.clone());

        let mut handles = Vec::new();
        for _ in 0..5 {
            let m = manager.clone();
            handles.push(tokio::spawn(async move { m.get_token().await }));
        }

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(transport.fetches.load(Ordering::SeqCst), 1);
        assert!(tokens.iter().all(|t| t == &tokens[0]));
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_fetch() {
        let transport = CountingTransport::new(0);
        let manager = manager(transport.clone());

        let first = manager.get_token().await.unwrap();
        let cached = manager.get_token().await.unwrap();
        assert_eq!(first, cached);
        assert_eq!(transport.fetches.load(Ordering::SeqCst), 1);

        manager.invalidate().await;
        let second = manager.get_token().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(transport.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_retries_transient_failures() {
        let transport = CountingTransport::new(2);
        let manager = manager(transport.clone());

        let token = manager.get_token().await.unwrap();
        assert_eq!(token, "token-2");
        assert_eq!(transport.fetches.load(Ordering::SeqCst), 3);
    }
}
