//! JSON envelope exchanged with the chat WebSocket
//!
//! The first client frame after the socket opens must be [`MessageType::Auth`]
//! carrying the bearer token (without the `Bearer` prefix) as `content`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Client credentials, content is the token
    Auth,
    /// User query
    Query,
    /// Piece of a model answer
    Chunk,
    /// Server-side failure, see `error`
    Error,
    #[serde(other)]
    Unknown,
}

/// Domain/scenario the next query runs against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub domain_id: Option<i64>,
    pub scenario_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub is_chunked: bool,
    #[serde(default)]
    pub is_last: bool,
    #[serde(rename = "domainID", default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<i64>,
    #[serde(rename = "scenarioID", default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    fn new(kind: MessageType, content: impl Into<String>, selection: Selection) -> Self {
        Self {
            kind,
            content: Some(content.into()),
            is_chunked: false,
            is_last: true,
            domain_id: selection.domain_id,
            scenario_id: selection.scenario_id,
            error: None,
        }
    }

    /// Handshake frame sent right after the socket opens
    pub fn auth(token: impl Into<String>, selection: Selection) -> Self {
        Self::new(MessageType::Auth, token, selection)
    }

    /// User query frame
    pub fn query(content: impl Into<String>, selection: Selection) -> Self {
        Self::new(MessageType::Query, content, selection)
    }

    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Server error text, ignoring empty strings
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_auth_envelope_shape() {
        let selection = Selection {
            domain_id: Some(3),
            scenario_id: None,
        };
        let raw = Envelope::auth("jwt-token", selection).encode().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "auth",
                "content": "jwt-token",
                "isChunked": false,
                "isLast": true,
                "domainID": 3
            })
        );
    }

    #[test]
    fn test_decode_chunk_with_defaults() {
        let env = Envelope::decode(r#"{"type":"chunk","content":"Hel","isChunked":true}"#).unwrap();
        assert_eq!(env.kind, MessageType::Chunk);
        assert!(env.is_chunked);
        assert!(!env.is_last);
        assert_eq!(env.content_str(), "Hel");
        assert!(env.error_message().is_none());
    }

    #[test]
    fn test_decode_error_and_unknown_type() {
        let env = Envelope::decode(r#"{"type":"error","error":"token expired"}"#).unwrap();
        assert_eq!(env.error_message(), Some("token expired"));

        let env = Envelope::decode(r#"{"type":"status","error":""}"#).unwrap();
        assert_eq!(env.kind, MessageType::Unknown);
        assert!(env.error_message().is_none());
        assert_eq!(env.content_str(), "");
    }
}
