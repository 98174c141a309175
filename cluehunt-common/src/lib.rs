//! # Clue Hunt Common Library
//!
//! Shared code for the clue hunt server and its tooling:
//! - Error and result types
//! - Bootstrap configuration (CLI / environment / TOML / defaults)
//! - Event types (HuntEvent enum) and the EventBus
//! - SSE stream helpers
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use events::{ChatMessage, ChatRole, EventBus, HuntEvent, TeamEvent};
