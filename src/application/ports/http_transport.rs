use crate::domain::value_objects::HttpMethod;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A fully-assembled request handed to the transport. Tokens have already
/// been merged into `headers` by the delivery pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl DeliveryRequest {
    pub fn new(url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value of a string field in a JSON body, if there is one.
    pub fn body_str(&self, field: &str) -> Option<&str> {
        self.body.as_ref()?.get(field)?.as_str()
    }

    /// The server rejected the anti-forgery token itself (csurf-style body
    /// code on a 403), as opposed to an ordinary authorization failure.
    pub fn is_csrf_rejection(&self) -> bool {
        self.status == 403 && self.body_str("code") == Some("EBADCSRFTOKEN")
    }

    pub fn is_session_expired(&self) -> bool {
        self.status == 401
    }

    /// Maps a non-2xx status into the error taxonomy. Returns `None` for
    /// successful responses.
    pub fn error_for_status(&self) -> Option<AppError> {
        if self.is_success() {
            return None;
        }
        let detail = self
            .body_str("message")
            .or_else(|| self.body_str("error"))
            .unwrap_or("no detail");
        let message = format!("status {}: {}", self.status, detail);
        Some(match self.status {
            400 | 422 => AppError::Validation(message),
            401 => AppError::Authentication(message),
            403 => AppError::Authorization(message),
            408 => AppError::Timeout(message),
            402..=499 => AppError::Client(message),
            500..=599 => AppError::Server(message),
            _ => AppError::Unknown(message),
        })
    }
}

/// Outbound HTTP seam. Implementations surface transport-level failures as
/// `AppError::Network`/`AppError::Timeout`; HTTP error statuses come back as
/// a normal `TransportResponse` for the delivery pipeline to classify.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &DeliveryRequest) -> Result<TransportResponse, AppError>;
}
