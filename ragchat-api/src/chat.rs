//! Chat session REST client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragchat_core::models::{Session, ShortSession};

use crate::base::{ApiResult, ChatApi};
use crate::http::HttpClient;

const CHAT_PATH: &str = "/api/v1/chat";

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListSessionsResponse {
    #[serde(default)]
    chats: Vec<ShortSession>,
}

#[derive(Debug, Serialize)]
struct RenameSessionRequest<'a> {
    title: &'a str,
}

#[derive(Clone)]
pub struct ChatClient {
    http: HttpClient,
}

impl ChatClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatApi for ChatClient {
    async fn create_session(&self) -> ApiResult<String> {
        let resp: CreateSessionResponse = self
            .http
            .post(CHAT_PATH, &serde_json::json!({}))
            .await?;
        debug!("Created chat session {}", resp.id);
        Ok(resp.id)
    }

    async fn list_sessions(&self) -> ApiResult<Vec<ShortSession>> {
        let resp: ListSessionsResponse = self.http.get(&format!("{}/list", CHAT_PATH)).await?;
        Ok(resp.chats)
    }

    async fn rename_session(&self, id: &str, title: &str) -> ApiResult<()> {
        self.http
            .put(&format!("{}/{}", CHAT_PATH, id), &RenameSessionRequest { title })
            .await
    }

    async fn delete_session(&self, id: &str) -> ApiResult<()> {
        self.http.delete(&format!("{}/{}", CHAT_PATH, id)).await
    }

    async fn get_session(&self, id: &str) -> ApiResult<Session> {
        self.http.get(&format!("{}/history/{}", CHAT_PATH, id)).await
    }
}
