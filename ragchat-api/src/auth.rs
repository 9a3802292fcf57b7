//! Login client

use async_trait::async_trait;
use tracing::info;

use ragchat_core::models::{LoginRequest, LoginResponse};

use crate::base::{ApiResult, AuthApi};
use crate::http::HttpClient;

const LOGIN_PATH: &str = "/auth/v1/login";

#[derive(Clone)]
pub struct AuthClient {
    http: HttpClient,
}

impl AuthClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    /// Exchange credentials for a token; the token is also stored in the shared [`TokenStore`](crate::TokenStore)
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp: LoginResponse = self.http.post(LOGIN_PATH, &req).await?;
        self.http.token().set(resp.token.clone());
        info!("Logged in as {}", email);
        Ok(resp)
    }
}
