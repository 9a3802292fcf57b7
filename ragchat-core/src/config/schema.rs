//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for ragchat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend endpoints
    #[serde(default)]
    pub api: ApiConfig,
    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,
    /// WebSocket reconnection policy
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Domain and scenario used by `chat` when none is given
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST gateway
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Base URL of the chat WebSocket; the session id is appended
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:9000/api/v1/chat/ws".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Stored credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Bearer token issued by the login endpoint (without the `Bearer` prefix)
    #[serde(default)]
    pub token: String,
    /// Email used for the last successful login
    #[serde(default)]
    pub email: String,
}

impl AuthConfig {
    /// Token if one is configured
    pub fn token(&self) -> Option<&str> {
        let token = self.token.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// Bounded exponential backoff for WebSocket reconnects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Consecutive failed attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first reconnect attempt
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound for a single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Growth factor between attempts
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// Remembered domain/scenario selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<i64>,
}

/// Pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when listing domains
    #[serde(default = "default_domains_limit")]
    pub domains_limit: u32,
}

fn default_domains_limit() -> u32 {
    10
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            domains_limit: default_domains_limit(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Also write logs to stderr
    #[serde(default = "default_log_console")]
    pub console: bool,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_console() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            console: default_log_console(),
            overrides: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api":{"base_url":"https://rag.example"}}"#).unwrap();
        assert_eq!(config.api.base_url, "https://rag.example");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.pagination.domains_limit, 10);
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_auth_token_blank_is_none() {
        let mut auth = AuthConfig::default();
        assert!(auth.token().is_none());

        auth.token = "  ".to_string();
        assert!(auth.token().is_none());

        auth.token = "jwt".to_string();
        assert_eq!(auth.token(), Some("jwt"));
    }
}
