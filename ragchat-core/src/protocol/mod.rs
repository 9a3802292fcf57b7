//! WebSocket chat protocol

pub mod envelope;

pub use envelope::{Envelope, MessageType, Selection};
