//! Core types for ragchat
//!
//! This crate provides the data model shared by the REST clients and the
//! session store, the WebSocket envelope, configuration and logging.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod utils;

pub use error::{Error, Result};
