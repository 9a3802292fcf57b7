//! Notifications published by the store after each state change

use std::time::Duration;

/// Published on the store's broadcast channel; receivers re-read state as needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Socket is open and the auth frame went out
    Connected { session_id: String },
    /// A chunk was appended to the last displayed response
    Chunk { content: String },
    /// The model finished answering and input is enabled again
    AnswerFinished,
    /// Server reported an error; the connection stays open
    ChatError { message: String },
    /// Socket closed, either by the peer or by `disconnect`
    Disconnected { session_id: String },
    /// Waiting `delay` before reconnect attempt `attempt`
    Reconnecting {
        session_id: String,
        attempt: u32,
        delay: Duration,
    },
    /// Retry budget spent; the store stays disconnected
    ReconnectExhausted { session_id: String },
    SessionsUpdated,
    DomainsUpdated,
}
