//! Error types for the session store

use ragchat_api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("No active chat session")]
    NoActiveSession,

    #[error("Not authenticated, log in first")]
    NotAuthenticated,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// True when logging in again would help
    pub fn needs_login(&self) -> bool {
        match self {
            StoreError::NotAuthenticated => true,
            StoreError::Api(e) => e.is_unauthorized(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_login() {
        assert!(StoreError::NotAuthenticated.needs_login());
        assert!(StoreError::Api(ApiError::Status {
            status: 401,
            body: "expired".to_string()
        })
        .needs_login());
        assert!(!StoreError::Api(ApiError::Status {
            status: 500,
            body: String::new()
        })
        .needs_login());
        assert!(!StoreError::NoActiveSession.needs_login());
    }
}
