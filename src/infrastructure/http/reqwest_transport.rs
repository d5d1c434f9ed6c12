use crate::application::ports::{DeliveryRequest, HttpTransport, TransportResponse};
use crate::domain::value_objects::HttpMethod;
use crate::shared::config::ApiConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::time::Duration;

/// reqwest-backed [`HttpTransport`]. Relative paths are resolved against the
/// configured base url; absolute urls pass through untouched.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| AppError::Network(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.base_url, url)
        }
    }
}

fn method_of(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &DeliveryRequest) -> Result<TransportResponse, AppError> {
        let url = self.resolve(&request.url);
        let mut builder = self.client.request(method_of(request.method), &url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        // Non-JSON bodies are treated as absent; classification only needs
        // the status and the optional JSON error shape.
        let body = response.json::<serde_json::Value>().await.ok();

        Ok(TransportResponse { status, body })
    }
}
