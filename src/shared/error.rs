use thiserror::Error;

/// Closed error taxonomy shared by every component of the pipeline.
///
/// The retry engine consults [`AppError::is_retryable`]; everything else
/// matches on the variant it cares about, so new failure categories must be
/// added here rather than smuggled through `Unknown`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Authorization error: {0}")]
    Authorization(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Offline: {0}")]
    Offline(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Client error: {0}")]
    Client(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Categories the retry engine is allowed to retry automatically.
    /// Authentication is deliberately excluded: it is routed through the
    /// refresh coordinator instead of a blind retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_)
                | AppError::Timeout(_)
                | AppError::Server(_)
                | AppError::Offline(_)
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_categories_match_policy() {
        assert!(AppError::Network("reset".into()).is_retryable());
        assert!(AppError::Timeout("deadline".into()).is_retryable());
        assert!(AppError::Server("500".into()).is_retryable());
        assert!(AppError::Offline("no link".into()).is_retryable());

        assert!(!AppError::Validation("bad field".into()).is_retryable());
        assert!(!AppError::Authentication("expired".into()).is_retryable());
        assert!(!AppError::Authorization("forbidden".into()).is_retryable());
        assert!(!AppError::Client("404".into()).is_retryable());
        assert!(!AppError::Persistence("quota".into()).is_retryable());
        assert!(!AppError::Unknown("??".into()).is_retryable());
    }
}
