use crate::application::ports::{DeliveryRequest, HttpTransport};
use crate::domain::value_objects::HttpMethod;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

struct RefreshState {
    in_flight: bool,
    /// Bumped by `reset()`. A leader settles its waiters only while its
    /// generation is still current; a refresh that straddled a logout
    /// belongs to the dead session and must not leak into the new one.
    generation: u64,
    waiters: Vec<oneshot::Sender<Result<()>>>,
}

/// Single-flight session refresh.
///
/// The first caller that observes a session-expired response becomes the
/// leader and issues exactly one refresh call; every other caller that hits
/// expiry while the refresh is outstanding is parked as a waiter and woken
/// FIFO with the shared outcome. Without this coordination, N concurrently
/// expired requests would race to rotate the session and invalidate each
/// other's cookies.
pub struct AuthRefreshCoordinator {
    transport: Arc<dyn HttpTransport>,
    refresh_endpoint: String,
    state: Mutex<RefreshState>,
}

impl AuthRefreshCoordinator {
    pub fn new(transport: Arc<dyn HttpTransport>, refresh_endpoint: String) -> Self {
        Self {
            transport,
            refresh_endpoint,
            state: Mutex::new(RefreshState {
                in_flight: false,
                generation: 0,
                waiters: Vec::new(),
            }),
        }
    }

    /// Resolves once the session has been refreshed (or the refresh failed).
    /// `Ok(())` means the caller should replay its original request once
    /// through the normal delivery path; the coordinator never retries the
    /// refresh itself.
    pub async fn recover(&self) -> Result<()> {
        let (waiter, generation) = {
            let mut state = self.state.lock().await;
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                (Some(rx), state.generation)
            } else {
                state.in_flight = true;
                (None, state.generation)
            }
        };

        if let Some(rx) = waiter {
            return match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(AppError::Authentication(
                    "session refresh abandoned".to_string(),
                )),
            };
        }

        let outcome = self.perform_refresh().await;

        let waiters = {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                // reset() ran while the refresh was on the wire. The state
                // now belongs to the next session: leave it alone and report
                // the logout to this caller instead of the stale outcome.
                return Err(AppError::Authentication("logged out".to_string()));
            }
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        tracing::debug!(
            target: "sync::auth",
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "session refresh settled"
        );
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }

        outcome
    }

    /// Logout: discard parked waiters with an authentication failure and
    /// return to Idle so a stale refresh cannot replay into a new session.
    pub async fn reset(&self) {
        let waiters = {
            let mut state = self.state.lock().await;
            state.in_flight = false;
            state.generation += 1;
            std::mem::take(&mut state.waiters)
        };
        for tx in waiters {
            let _ = tx.send(Err(AppError::Authentication("logged out".to_string())));
        }
    }

    async fn perform_refresh(&self) -> Result<()> {
        let request = DeliveryRequest::new(self.refresh_endpoint.clone(), HttpMethod::Post);
        let response = self
            .transport
            .execute(&request)
            .await
            .map_err(|err| AppError::Authentication(format!("session refresh failed: {err}")))?;

        if response.is_success() {
            Ok(())
        } else {
            Err(AppError::Authentication(format!(
                "session refresh rejected with status {}",
                response.status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TransportResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct RefreshTransport {
        calls: AtomicU32,
        status: u16,
        delay: Duration,
    }

    impl RefreshTransport {
        fn new(status: u16, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                status,
                delay: Duration::from_millis(delay_ms),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for RefreshTransport {
        async fn execute(&self, _request: &DeliveryRequest) -> Result<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(TransportResponse {
                status: self.status,
                body: None,
            })
        }
    }

    #[tokio::test]
    async fn concurrent_expiries_trigger_exactly_one_refresh() {
        let transport = RefreshTransport::new(200, 30);
        let coordinator = Arc::new(AuthRefreshCoordinator::new(
            transport.clone(),
            "/api/auth/refresh".to_string(),
        ));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let c = coordinator.clone();
            handles.push(tokio::spawn(async move { c.recover().await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_failure_rejects_every_waiter() {
        let transport = RefreshTransport::new(401, 30);
        let coordinator = Arc::new(AuthRefreshCoordinator::new(
            transport.clone(),
            "/api/auth/refresh".to_string(),
        ));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let c = coordinator.clone();
            handles.push(tokio::spawn(async move { c.recover().await }));
        }
        for handle in handles {
            let outcome = handle.await.unwrap();
            assert!(matches!(outcome, Err(AppError::Authentication(_))));
        }

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reset_rejects_parked_waiters() {
        let transport = RefreshTransport::new(200, 200);
        let coordinator = Arc::new(AuthRefreshCoordinator::new(
            transport,
            "/api/auth/refresh".to_string(),
        ));

        let leader = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.recover().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.recover().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        coordinator.reset().await;

        let waiter_outcome = waiter.await.unwrap();
        assert_eq!(
            waiter_outcome,
            Err(AppError::Authentication("logged out".to_string()))
        );

        // The leader's refresh was for the session that just ended, so its
        // outcome is discarded and the logout is reported instead.
        assert_eq!(
            leader.await.unwrap(),
            Err(AppError::Authentication("logged out".to_string()))
        );
    }

    struct ScriptedRefreshTransport {
        script: tokio::sync::Mutex<std::collections::VecDeque<(u16, u64)>>,
    }

    impl ScriptedRefreshTransport {
        fn new(script: Vec<(u16, u64)>) -> Arc<Self> {
            Arc::new(Self {
                script: tokio::sync::Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedRefreshTransport {
        async fn execute(&self, _request: &DeliveryRequest) -> Result<TransportResponse> {
            let (status, delay_ms) = self
                .script
                .lock()
                .await
                .pop_front()
                .expect("script exhausted");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok(TransportResponse { status, body: None })
        }
    }

    #[tokio::test]
    async fn refresh_straddling_a_reset_never_settles_the_next_session() {
        // Old session's refresh would succeed, the new session's fails; if
        // the old outcome leaked across the reset, the new waiter would see
        // a bogus Ok.
        let transport = ScriptedRefreshTransport::new(vec![(200, 100), (401, 100)]);
        let coordinator = Arc::new(AuthRefreshCoordinator::new(
            transport,
            "/api/auth/refresh".to_string(),
        ));

        let old_leader = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.recover().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        coordinator.reset().await;

        let new_leader = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.recover().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let new_waiter = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.recover().await })
        };

        assert_eq!(
            old_leader.await.unwrap(),
            Err(AppError::Authentication("logged out".to_string()))
        );
        assert!(matches!(
            new_leader.await.unwrap(),
            Err(AppError::Authentication(_))
        ));
        // The waiter parked on the new flight gets the new session's
        // outcome, never the dead session's Ok.
        assert!(matches!(
            new_waiter.await.unwrap(),
            Err(AppError::Authentication(_))
        ));
    }
}
