//! Shared reqwest wrapper: base URL, bearer token and status mapping

use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use ragchat_core::config::ApiConfig;
use ragchat_core::utils::{join_url, truncate};

use crate::base::{ApiError, ApiResult};

/// Bearer token shared by every client and the session store
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(token)),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: TokenStore,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, token: TokenStore) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }

    pub fn from_config(config: &ApiConfig, token: TokenStore) -> ApiResult<Self> {
        Self::new(config.base_url.clone(), config.timeout(), token)
    }

    pub fn token(&self) -> &TokenStore {
        &self.token
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = join_url(&self.base_url, path);
        debug!("{} {}", method, url);

        let builder = self.client.request(method, url);
        match self.token.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.request(Method::GET, path).send().await?;
        decode(response).await
    }

    pub async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        offset: u32,
        limit: u32,
    ) -> ApiResult<T> {
        let response = self
            .request(Method::GET, path)
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .await?;
        decode(response).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        decode(response).await
    }

    /// PUT whose response body is not needed
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        let response = self.request(Method::PUT, path).json(body).send().await?;
        check_status(response).await.map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let response = self.request(Method::DELETE, path).send().await?;
        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body: truncate(body.trim(), 512),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let response = check_status(response).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> HttpClient {
        HttpClient::new(
            server.uri(),
            Duration::from_secs(5),
            TokenStore::new(token.map(ToString::to_string)),
        )
        .unwrap()
    }

    #[test]
    fn test_token_store_is_shared_between_clones() {
        let token = TokenStore::default();
        let other = token.clone();
        token.set("abc");
        assert_eq!(other.get().as_deref(), Some("abc"));
        other.clear();
        assert!(token.get().is_none());
    }

    #[tokio::test]
    async fn test_get_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/ping"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let value: Value = client(&server, Some("secret")).get("/api/v1/ping").await.unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_get_paged_sets_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/domain/list"))
            .and(query_param("offset", "20"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let value: Vec<Value> = client(&server, None)
            .get_paged("/api/v1/domain/list", 20, 10)
            .await
            .unwrap();
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_maps_to_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/chat/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("chat not found"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .delete("/api/v1/chat/missing")
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "chat not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_maps_to_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server, None).get::<Value>("/broken").await.unwrap_err();
        assert!(matches!(err, ApiError::JsonError(_)));
    }
}
