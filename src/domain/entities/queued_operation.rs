use crate::domain::value_objects::{HttpMethod, OperationId, OperationStatus, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A state-changing call captured for later delivery.
///
/// Headers are stored exactly as the caller supplied them; authorization and
/// anti-forgery headers are merged in at delivery time so a queued operation
/// never ships a stale token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: OperationId,
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<serde_json::Value>,
    pub headers: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    pub priority: Priority,
    pub status: OperationStatus,
    pub retry_count: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl QueuedOperation {
    pub fn from_draft(draft: OperationDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: draft.id.unwrap_or_else(OperationId::generate),
            url: draft.url,
            method: draft.method,
            body: draft.body,
            headers: draft.headers,
            timestamp: now,
            priority: draft.priority,
            status: OperationStatus::Pending,
            retry_count: 0,
            last_attempt: None,
            error: None,
        }
    }

    pub fn mark_processing(&mut self) {
        self.status = OperationStatus::Processing;
    }

    pub fn mark_succeeded(&mut self, now: DateTime<Utc>) {
        self.status = OperationStatus::Succeeded;
        self.last_attempt = Some(now);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: String, now: DateTime<Utc>) {
        self.status = OperationStatus::Failed;
        self.retry_count += 1;
        self.last_attempt = Some(now);
        self.error = Some(error);
    }

    /// An operation still `processing` when no drain pass is running was
    /// interrupted before its outcome was recorded (crash, aborted pass).
    /// Requeue it as failed without counting an attempt.
    pub fn mark_interrupted(&mut self) {
        self.status = OperationStatus::Failed;
        self.error = Some("delivery interrupted before completion".to_string());
    }
}

/// Caller-supplied description of an operation before it is stamped with an
/// id, timestamp and status by the queue.
#[derive(Debug, Clone, Default)]
pub struct OperationDraft {
    pub id: Option<OperationId>,
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<serde_json::Value>,
    pub headers: BTreeMap<String, String>,
    pub priority: Priority,
}

impl OperationDraft {
    pub fn new(url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            id: None,
            url: url.into(),
            method,
            body: None,
            headers: BTreeMap::new(),
            priority: Priority::default(),
        }
    }

    pub fn with_id(mut self, id: OperationId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}
