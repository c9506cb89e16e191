//! Chat-completion HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use dronegpt_core::{CompletionRequest, CompletionResponse};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::ModelError;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Anything that can answer a completion request.
///
/// One call, one attempt: implementations never retry. Retry policy belongs
/// to the caller.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ModelError>;
}

/// HTTP client for an OpenAI-compatible chat-completion endpoint.
pub struct ChatCompletionClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl ChatCompletionClient {
    /// Create a client. Requests that take longer than `timeout` fail with
    /// `ModelError::Timeout`.
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ModelError::Request)?;
        let mut this = Self {
            client,
            url: url.into(),
            api_key: None,
        };
        this.set_api_key(api_key);
        Ok(this)
    }

    /// Update the bearer credential at runtime.
    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.api_key = api_key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatCompletion for ChatCompletionClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ModelError> {
        let body = serde_json::to_vec(request).map_err(ModelError::Encode)?;
        tracing::debug!(
            "Sending {} bytes ({} messages) to {}",
            body.len(),
            request.messages.len(),
            self.url
        );

        let mut builder = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body);
        if let Some(api_key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("Received {} bytes ({})", text.len(), status);

        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let completion: CompletionResponse =
            serde_json::from_str(&text).map_err(ModelError::Decode)?;
        if completion.choices.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(completion)
    }
}
