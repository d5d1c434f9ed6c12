use crate::application::ports::{DeliveryRequest, HttpTransport, TransportResponse};
use crate::application::services::auth_refresh::AuthRefreshCoordinator;
use crate::application::services::csrf_service::AntiForgeryTokenManager;
use crate::shared::config::ApiConfig;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;

/// The full delivery path for a single call: anti-forgery token attachment,
/// one-shot token-rejection recovery, and one-shot session-refresh recovery.
///
/// Both the immediate-send path and the queue drain go through `deliver`, so
/// queued operations honor exactly the same token machinery as live calls.
pub struct DeliveryPipeline {
    transport: Arc<dyn HttpTransport>,
    csrf: Arc<AntiForgeryTokenManager>,
    auth: Arc<AuthRefreshCoordinator>,
    csrf_header: String,
    login_paths: Vec<String>,
}

impl DeliveryPipeline {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        csrf: Arc<AntiForgeryTokenManager>,
        auth: Arc<AuthRefreshCoordinator>,
        api: &ApiConfig,
    ) -> Self {
        Self {
            transport,
            csrf,
            auth,
            csrf_header: api.csrf_header.clone(),
            login_paths: api.login_paths.clone(),
        }
    }

    pub async fn deliver(&self, request: &DeliveryRequest) -> Result<TransportResponse> {
        let mut response = self.send_with_token(request).await?;

        if response.is_csrf_rejection() {
            tracing::info!(
                target: "sync::delivery",
                url = %request.url,
                "anti-forgery token rejected, refetching once"
            );
            self.csrf.refresh().await?;
            response = self.send_with_token(request).await?;
            if response.is_csrf_rejection() {
                return Err(AppError::Authorization(
                    "anti-forgery token rejected after refresh".to_string(),
                ));
            }
        }

        if response.is_session_expired() && !self.is_login_path(&request.url) {
            tracing::info!(
                target: "sync::delivery",
                url = %request.url,
                "session expired, coordinating refresh"
            );
            self.auth.recover().await?;
            // The refreshed session invalidates the old anti-forgery token.
            self.csrf.invalidate().await;
            response = self.send_with_token(request).await?;
            if response.is_session_expired() {
                return Err(AppError::Authentication(
                    "session still expired after refresh".to_string(),
                ));
            }
        }

        match response.error_for_status() {
            None => Ok(response),
            Some(err) => Err(err),
        }
    }

    async fn send_with_token(&self, request: &DeliveryRequest) -> Result<TransportResponse> {
        let mut outgoing = request.clone();
        if outgoing.method.is_state_changing() {
            let token = self.csrf.get_token().await?;
            outgoing.headers.insert(self.csrf_header.clone(), token);
        }
        self.transport.execute(&outgoing).await
    }

    fn is_login_path(&self, url: &str) -> bool {
        self.login_paths.iter().any(|path| url.starts_with(path))
    }
}
