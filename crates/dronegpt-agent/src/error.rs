//! Agent-side failures.

use std::time::Duration;

use dronegpt_chat::ModelError;
use dronegpt_core::{ContextError, ConversationError, ParseError, Role};
use dronegpt_sdk::{FrameFormat, SdkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("unsupported frame format {0:?}")]
    UnsupportedFormat(FrameFormat),

    #[error("frame is {actual} bytes, expected {expected} for {width}x{height}")]
    BadLength {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error("{action} did not complete within {timeout:?}")]
    ActionTimeout {
        action: &'static str,
        timeout: Duration,
    },
}

/// Why a run ended abnormally.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("a run is already active")]
    AlreadyRunning,

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("expected an assistant reply with text, got a {0:?} message")]
    UnexpectedReply(Role),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error("failed to encode observation: {0}")]
    Observation(#[from] serde_json::Error),

    #[error("run task aborted: {0}")]
    Aborted(String),
}
