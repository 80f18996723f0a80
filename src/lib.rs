//! Aria - Conversational Avatar Backend
//!
//! Turns free-text replies from a generative backend into structured
//! intent classifications, synthesized voice clips, and playback-synced
//! avatar animation packets.

pub mod avatar;
pub mod error;
pub mod generation;
pub mod parser;
pub mod persona;
pub mod pipeline;
pub mod server;
pub mod session;
pub mod speech;
pub mod types;

pub use error::{AriaError, Result};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
