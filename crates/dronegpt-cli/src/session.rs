//! Multi-turn chat session. Unlike the agent, every turn sends the whole
//! history.

use std::sync::Arc;

use dronegpt_chat::{ChatCompletion, ModelError};
use dronegpt_core::{CompletionRequest, ConversationMessage};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_CHAT_PROMPT: &str =
    "You're a helpful assistant being used in a command line interface (CLI).";

pub struct ChatSession {
    model: String,
    client: Arc<dyn ChatCompletion>,
    messages: Vec<ConversationMessage>,
}

impl ChatSession {
    pub fn new(
        client: Arc<dyn ChatCompletion>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            client,
            messages: vec![ConversationMessage::system(system_prompt)],
        }
    }

    /// Send a user message and append the reply. On failure the user
    /// message is withdrawn so the history stays a sequence of full turns.
    pub async fn add(
        &mut self,
        content: impl Into<String>,
    ) -> Result<&ConversationMessage, ModelError> {
        self.messages.push(ConversationMessage::user(content));
        let request = CompletionRequest::new(self.model.as_str(), self.messages.clone());

        let reply = match self.client.complete(&request).await {
            Ok(response) => response.into_first_message().ok_or(ModelError::EmptyResponse),
            Err(err) => Err(err),
        };
        match reply {
            Ok(reply) => {
                self.messages.push(reply);
                Ok(&self.messages[self.messages.len() - 1])
            }
            Err(err) => {
                self.messages.pop();
                Err(err)
            }
        }
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn last_user_message(&self) -> Option<&ConversationMessage> {
        self.messages.iter().rev().find(|message| message.is_user())
    }

    pub fn last_assistant_message(&self) -> Option<&ConversationMessage> {
        self.messages.iter().rev().find(|message| message.is_assistant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dronegpt_core::{Choice, CompletionResponse};
    use std::sync::Mutex;

    /// Echoes the number of messages it was sent.
    #[derive(Default)]
    struct Counter {
        seen: Mutex<Vec<usize>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatCompletion for Counter {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, ModelError> {
            if self.fail {
                return Err(ModelError::Status {
                    status: 503,
                    body: String::new(),
                });
            }
            self.seen.lock().unwrap().push(request.messages.len());
            Ok(CompletionResponse {
                choices: vec![Choice {
                    message: ConversationMessage::assistant(format!(
                        "{} messages",
                        request.messages.len()
                    )),
                    finish_reason: None,
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_sends_full_history() {
        let client = Arc::new(Counter::default());
        let mut session = ChatSession::new(client.clone(), DEFAULT_CHAT_MODEL, DEFAULT_CHAT_PROMPT);

        let reply = session.add("hello").await.unwrap();
        assert_eq!(reply.text(), Some("2 messages"));
        session.add("again").await.unwrap();

        assert_eq!(*client.seen.lock().unwrap(), vec![2, 4]);
        assert_eq!(session.messages().len(), 5);
        assert_eq!(session.last_user_message().unwrap().text(), Some("again"));
        assert_eq!(session.last_assistant_message().unwrap().text(), Some("4 messages"));
    }

    #[tokio::test]
    async fn test_failed_turn_is_withdrawn() {
        let client = Arc::new(Counter {
            fail: true,
            ..Default::default()
        });
        let mut session = ChatSession::new(client, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_PROMPT);

        assert!(session.add("hello").await.is_err());
        assert_eq!(session.messages().len(), 1);
        assert!(session.last_user_message().is_none());
    }
}
