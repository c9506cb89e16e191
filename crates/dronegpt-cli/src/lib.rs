//! DroneGPT CLI - plain multi-turn chat with the model endpoint.
//!
//! Useful for checking credentials and model behavior without an aircraft.
//! Binaries:
//! - chat: interactive REPL

pub mod session;

pub use session::{ChatSession, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_PROMPT};
