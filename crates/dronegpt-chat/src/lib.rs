//! DroneGPT Chat - chat-completion API client
//!
//! Sends completion requests over HTTP and classifies failures so the agent
//! loop can decide what is worth retrying.

pub mod client;
pub mod error;

pub use client::{ChatCompletion, ChatCompletionClient, DEFAULT_API_URL};
pub use error::ModelError;
