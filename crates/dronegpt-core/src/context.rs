//! Context selection: the reduced message list actually sent to the model.
//!
//! The request is bounded no matter how long a session runs:
//!
//! ```text
//! [system prompt, last user command, anchor observation,
//!  first assistant reply after the anchor, latest observation]
//! ```
//!
//! The last two entries only appear once the loop has gone around at least
//! once since the command was issued.

use thiserror::Error;

use crate::chat::ConversationMessage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("conversation does not start with a system prompt")]
    MissingSystemPrompt,

    #[error("conversation has no user command")]
    NoUserMessage,

    #[error("user command at index {0} is not followed by an observation")]
    MissingAnchorObservation(usize),
}

/// Select the messages for the next completion request.
pub fn select_context(
    messages: &[ConversationMessage],
) -> Result<Vec<ConversationMessage>, ContextError> {
    let system = messages
        .first()
        .filter(|message| message.is_system())
        .ok_or(ContextError::MissingSystemPrompt)?;

    let user_index = messages
        .iter()
        .rposition(ConversationMessage::is_user)
        .ok_or(ContextError::NoUserMessage)?;

    let anchor_index = user_index + 1;
    let anchor = messages
        .get(anchor_index)
        .filter(|message| message.is_observation())
        .ok_or(ContextError::MissingAnchorObservation(user_index))?;

    let mut selected = vec![system.clone(), messages[user_index].clone(), anchor.clone()];

    let since_anchor = &messages[anchor_index + 1..];
    if since_anchor.is_empty() {
        return Ok(selected);
    }

    if let Some(plan) = since_anchor.iter().find(|message| message.is_assistant()) {
        selected.push(plan.clone());
    }
    if let Some(latest) = since_anchor.iter().rev().find(|message| message.is_observation()) {
        selected.push(latest.clone());
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Observation;

    fn observation(tag: &str) -> ConversationMessage {
        ConversationMessage::Observation(Observation {
            state: tag.to_string(),
            image: None,
        })
    }

    #[test]
    fn test_first_iteration_sends_three_messages() {
        let log = vec![
            ConversationMessage::system("prompt"),
            ConversationMessage::user("Take off"),
            observation("obs-1"),
        ];

        let selected = select_context(&log).unwrap();
        assert_eq!(selected, log);
    }

    #[test]
    fn test_second_iteration_sends_plan_and_latest_observation() {
        let log = vec![
            ConversationMessage::system("prompt"),
            ConversationMessage::user("Take off"),
            observation("obs-1"),
            ConversationMessage::assistant("{\"type\":\"take_off\"}"),
            observation("obs-2"),
        ];

        let selected = select_context(&log).unwrap();
        assert_eq!(selected.len(), 5);
        assert_eq!(selected, log);
    }

    #[test]
    fn test_long_session_stays_bounded() {
        let mut log = vec![
            ConversationMessage::system("prompt"),
            ConversationMessage::user("Take off"),
            observation("old-anchor"),
            ConversationMessage::assistant("old plan"),
            observation("old-2"),
            ConversationMessage::user("Fly forward"),
            observation("anchor"),
            ConversationMessage::assistant("plan"),
        ];
        for i in 0..20 {
            log.push(observation(&format!("obs-{i}")));
            log.push(ConversationMessage::assistant(format!("step {i}")));
        }
        log.push(observation("latest"));

        let selected = select_context(&log).unwrap();
        assert_eq!(
            selected,
            vec![
                ConversationMessage::system("prompt"),
                ConversationMessage::user("Fly forward"),
                observation("anchor"),
                ConversationMessage::assistant("plan"),
                observation("latest"),
            ]
        );
    }

    #[test]
    fn test_anchor_is_not_repeated_as_latest() {
        let log = vec![
            ConversationMessage::system("prompt"),
            ConversationMessage::user("Land"),
            observation("anchor"),
            ConversationMessage::control("{\"type\":\"stop\"}"),
        ];

        let selected = select_context(&log).unwrap();
        assert_eq!(selected.len(), 4);
        assert!(selected[3].is_assistant());
    }

    #[test]
    fn test_requires_user_message() {
        let log = vec![ConversationMessage::system("prompt")];
        assert_eq!(select_context(&log), Err(ContextError::NoUserMessage));
    }

    #[test]
    fn test_requires_anchor_observation() {
        let log = vec![
            ConversationMessage::system("prompt"),
            ConversationMessage::user("Take off"),
        ];
        assert_eq!(
            select_context(&log),
            Err(ContextError::MissingAnchorObservation(1))
        );
    }

    #[test]
    fn test_requires_system_prompt() {
        let log = vec![ConversationMessage::user("Take off"), observation("obs")];
        assert_eq!(select_context(&log), Err(ContextError::MissingSystemPrompt));
    }
}
