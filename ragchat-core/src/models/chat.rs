//! Chat session records and the display projection the store renders from

use serde::{Deserialize, Serialize};

use super::time::Timestamp;

/// Session as returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortSession {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub user_id: i64,
}

/// Full session record with its history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub content: Vec<SessionContentMessage>,
}

/// A persisted query/response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContentMessage {
    pub query: SessionQuery,
    #[serde(default)]
    pub response: SessionResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionQuery {
    pub id: i64,
    pub chat_id: String,
    pub content: String,
    pub created_at: Timestamp,
    pub domain_id: i64,
    pub scenario_id: i64,
    pub user_id: i64,
    pub source_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionResponse {
    pub id: i64,
    pub chat_id: String,
    pub query_id: i64,
    pub content: String,
    pub status: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One rendered exchange; `response` grows while chunks stream in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayedExchange {
    pub query: String,
    pub response: Option<String>,
}

/// Ordered conversation as shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayedSession {
    pub messages: Vec<DisplayedExchange>,
}

impl DisplayedSession {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last(&self) -> Option<&DisplayedExchange> {
        self.messages.last()
    }

    /// Append a query that has not been answered yet
    pub fn push_query(&mut self, query: impl Into<String>) {
        self.messages.push(DisplayedExchange {
            query: query.into(),
            response: None,
        });
    }

    /// Append a chunk to the last response. Returns false when there is no message to extend.
    pub fn append_chunk(&mut self, chunk: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) => {
                last.response.get_or_insert_with(String::new).push_str(chunk);
                true
            }
            None => false,
        }
    }
}

impl From<&Session> for DisplayedSession {
    fn from(session: &Session) -> Self {
        Self {
            messages: session
                .content
                .iter()
                .map(|pair| DisplayedExchange {
                    query: pair.query.content.clone(),
                    response: Some(pair.response.content.clone()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(query: &str, response: &str) -> SessionContentMessage {
        SessionContentMessage {
            query: SessionQuery {
                content: query.to_string(),
                ..Default::default()
            },
            response: SessionResponse {
                content: response.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_displayed_projection_keeps_order() {
        let session = Session {
            id: "s1".to_string(),
            title: "t".to_string(),
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
            user_id: 1,
            content: vec![pair("q1", "r1"), pair("q2", "r2")],
        };

        let displayed = DisplayedSession::from(&session);
        assert_eq!(displayed.len(), 2);
        assert_eq!(displayed.messages[0].query, "q1");
        assert_eq!(displayed.messages[1].response.as_deref(), Some("r2"));
    }

    #[test]
    fn test_append_chunk_accumulates() {
        let mut displayed = DisplayedSession::default();
        assert!(!displayed.append_chunk("orphan"));

        displayed.push_query("hi");
        assert_eq!(displayed.last().unwrap().response, None);

        assert!(displayed.append_chunk("Hel"));
        assert!(displayed.append_chunk("lo"));
        assert_eq!(displayed.last().unwrap().response.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_session_decodes_camel_case_history() {
        let raw = r#"{
            "id": "6f1c",
            "title": "Prices",
            "userId": 3,
            "createdAt": {"seconds": 10},
            "content": [
                {"query": {"id": 1, "chatId": "6f1c", "content": "hi", "domainId": 2, "scenarioId": 5},
                 "response": {"id": 9, "queryId": 1, "content": "hello", "status": 2}}
            ]
        }"#;
        let session: Session = serde_json::from_str(raw).unwrap();
        assert_eq!(session.user_id, 3);
        assert_eq!(session.content[0].query.scenario_id, 5);
        assert_eq!(session.content[0].response.content, "hello");
    }
}
