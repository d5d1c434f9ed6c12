use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub csrf_endpoint: String,
    pub csrf_header: String,
    pub refresh_endpoint: String,
    /// Paths on which a 401 means "invalid credentials" and must be surfaced
    /// verbatim instead of triggering a session refresh.
    pub login_paths: Vec<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub token_fetch_max_retries: u32,
    pub token_fetch_base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/syncline.db".to_string(),
                max_connections: 5,
            },
            api: ApiConfig {
                base_url: "http://localhost:3000".to_string(),
                csrf_endpoint: "/api/csrf-token".to_string(),
                csrf_header: "x-csrf-token".to_string(),
                refresh_endpoint: "/api/auth/refresh".to_string(),
                login_paths: vec!["/api/auth/login".to_string()],
                request_timeout_secs: 30,
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_delay_ms: 1000,
                max_delay_ms: 10_000,
                token_fetch_max_retries: 3,
                token_fetch_base_delay_ms: 500,
            },
            sync: SyncConfig {
                auto_sync: true,
                sync_interval_secs: 120, // 2 minutes
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SYNCLINE_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v;
            }
        }
        if let Ok(v) = std::env::var("SYNCLINE_API_BASE_URL") {
            if !v.trim().is_empty() {
                cfg.api.base_url = v;
            }
        }
        if let Ok(v) = std::env::var("SYNCLINE_LOGIN_PATHS") {
            let paths: Vec<String> = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !paths.is_empty() {
                cfg.api.login_paths = paths;
            }
        }
        if let Ok(v) = std::env::var("SYNCLINE_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("SYNCLINE_SYNC_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.sync_interval_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("SYNCLINE_MAX_RETRIES") {
            if let Some(value) = parse_u64(&v) {
                cfg.retry.max_retries = value as u32;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.api.base_url.trim().is_empty() {
            return Err("Api base_url cannot be empty".to_string());
        }
        if self.retry.max_retries == 0 {
            return Err("Retry max_retries must be greater than 0".to_string());
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err("Retry initial_delay_ms cannot exceed max_delay_ms".to_string());
        }
        if self.sync.sync_interval_secs == 0 {
            return Err("Sync sync_interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
