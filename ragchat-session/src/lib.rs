//! Client-side chat session store for ragchat
//!
//! [`SessionStore`] owns the session list, the active session's displayed
//! history, the domain/scenario selection and a single streaming chat socket
//! with bounded reconnects.

mod connection;
pub mod error;
pub mod events;
pub mod reconnect;
pub mod state;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use events::StoreEvent;
pub use reconnect::ReconnectPolicy;
pub use state::{ConnectionState, QueryStart, StoreState};
pub use store::{SessionStore, StoreOptions};
