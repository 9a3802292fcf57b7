//! REST clients for the ragchat backend
//!
//! Each service is exposed as a trait ([`ChatApi`], [`DomainApi`], [`AuthApi`])
//! with a reqwest-backed implementation sharing one [`HttpClient`].

pub mod auth;
pub mod base;
pub mod chat;
pub mod domain;
pub mod http;

pub use auth::AuthClient;
pub use base::{ApiError, ApiResult, AuthApi, ChatApi, DomainApi};
pub use chat::ChatClient;
pub use domain::DomainClient;
pub use http::{HttpClient, TokenStore};

use ragchat_core::config::ApiConfig;

/// The three service clients built over one HTTP client
#[derive(Clone)]
pub struct ApiClients {
    pub auth: AuthClient,
    pub chat: ChatClient,
    pub domain: DomainClient,
}

impl ApiClients {
    pub fn from_config(config: &ApiConfig, token: TokenStore) -> ApiResult<Self> {
        let http = HttpClient::from_config(config, token)?;
        Ok(Self {
            auth: AuthClient::new(http.clone()),
            chat: ChatClient::new(http.clone()),
            domain: DomainClient::new(http),
        })
    }
}
