//! Model client failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("completion request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("could not connect to completion endpoint: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("completion transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid completion request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("failed to encode completion request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("unexpected response {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("completion response has no choices")]
    EmptyResponse,
}

impl ModelError {
    /// Network-level failures that may succeed on the next attempt.
    ///
    /// Timeouts, connection failures, interrupted transfers, rate limiting
    /// and server errors are transient. A response that arrived but cannot
    /// be understood is a protocol failure and is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) | Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Request(_) | Self::Encode(_) | Self::Decode(_) | Self::EmptyResponse => false,
        }
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else if err.is_connect() {
            Self::Connect(err)
        } else if err.is_builder() {
            Self::Request(err)
        } else {
            Self::Transport(err)
        }
    }
}
