//! Client traits for the backend services

use async_trait::async_trait;
use ragchat_core::models::{
    CreateDomainRequest, CreateScenarioRequest, CreateSourceRequest, Domain, LoginResponse,
    Scenario, Session, ShortSession, Source,
};
use thiserror::Error;

/// Error type for REST operations
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Chat session CRUD
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Create a session and return its id
    async fn create_session(&self) -> ApiResult<String>;

    async fn list_sessions(&self) -> ApiResult<Vec<ShortSession>>;

    async fn rename_session(&self, id: &str, title: &str) -> ApiResult<()>;

    async fn delete_session(&self, id: &str) -> ApiResult<()>;

    /// Full session including its query/response history
    async fn get_session(&self, id: &str) -> ApiResult<Session>;
}

/// Source, domain and scenario CRUD
#[async_trait]
pub trait DomainApi: Send + Sync {
    async fn list_sources(&self) -> ApiResult<Vec<Source>>;

    async fn create_source(&self, req: &CreateSourceRequest) -> ApiResult<Source>;

    async fn create_domain(&self, req: &CreateDomainRequest) -> ApiResult<Domain>;

    async fn list_domains(&self, offset: u32, limit: u32) -> ApiResult<Vec<Domain>>;

    async fn get_domain(&self, id: i64) -> ApiResult<Domain>;

    async fn create_scenario(&self, req: &CreateScenarioRequest) -> ApiResult<Scenario>;

    async fn list_scenarios(&self, offset: u32, limit: u32) -> ApiResult<Vec<Scenario>>;

    async fn get_scenario(&self, id: i64) -> ApiResult<Scenario>;
}

/// Credential exchange
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 404,
            body: "chat not found".to_string(),
        };
        assert_eq!(err.to_string(), "Server returned 404: chat not found");
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_unauthorized());
    }
}
