//! Append-only conversation log.

use thiserror::Error;

use crate::chat::ConversationMessage;
use crate::context::{select_context, ContextError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("the system prompt is fixed at the start of the conversation")]
    DuplicateSystemPrompt,
}

/// Ordered record of everything said in a session.
///
/// Index 0 is always the one system prompt. Entries are never edited or
/// removed.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    messages: Vec<ConversationMessage>,
}

impl ConversationLog {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ConversationMessage::system(system_prompt)],
        }
    }

    /// Append a message, returning its index.
    pub fn append(&mut self, message: ConversationMessage) -> Result<usize, ConversationError> {
        if message.is_system() {
            return Err(ConversationError::DuplicateSystemPrompt);
        }
        self.messages.push(message);
        Ok(self.messages.len() - 1)
    }

    pub fn all(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Operator-facing transcript: user commands and model replies.
    pub fn visible(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter().filter(|message| message.is_visible())
    }

    pub fn system_prompt(&self) -> &ConversationMessage {
        &self.messages[0]
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    pub fn last_user_message(&self) -> Option<&ConversationMessage> {
        self.messages.iter().rev().find(|message| message.is_user())
    }

    pub fn last_assistant_message(&self) -> Option<&ConversationMessage> {
        self.messages.iter().rev().find(|message| message.is_assistant())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true; the system prompt is always present.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Reduced message list for the next request.
    pub fn select_context(&self) -> Result<Vec<ConversationMessage>, ContextError> {
        select_context(&self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Observation;

    #[test]
    fn test_starts_with_system_prompt() {
        let log = ConversationLog::new("prompt");
        assert_eq!(log.len(), 1);
        assert_eq!(log.system_prompt(), &ConversationMessage::system("prompt"));
    }

    #[test]
    fn test_rejects_second_system_prompt() {
        let mut log = ConversationLog::new("prompt");
        assert_eq!(
            log.append(ConversationMessage::system("again")),
            Err(ConversationError::DuplicateSystemPrompt)
        );
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_visible_hides_observations_and_control_turns() {
        let mut log = ConversationLog::new("prompt");
        log.append(ConversationMessage::user("Take off")).unwrap();
        log.append(ConversationMessage::Observation(Observation {
            state: "{}".to_string(),
            image: None,
        }))
        .unwrap();
        log.append(ConversationMessage::assistant("{\"type\":\"take_off\"}"))
            .unwrap();
        log.append(ConversationMessage::control("{\"type\":\"stop\"}"))
            .unwrap();

        let visible: Vec<_> = log.visible().cloned().collect();
        assert_eq!(
            visible,
            vec![
                ConversationMessage::user("Take off"),
                ConversationMessage::assistant("{\"type\":\"take_off\"}"),
            ]
        );
        assert_eq!(log.all().len(), 5);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut log = ConversationLog::new("prompt");
        assert_eq!(log.append(ConversationMessage::user("a")).unwrap(), 1);
        assert_eq!(log.append(ConversationMessage::assistant("b")).unwrap(), 2);
        assert_eq!(log.last_user_message(), Some(&ConversationMessage::user("a")));
        assert_eq!(
            log.last_assistant_message(),
            Some(&ConversationMessage::assistant("b"))
        );
    }
}
