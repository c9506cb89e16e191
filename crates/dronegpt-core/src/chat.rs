//! Conversation messages and the chat-completion wire format.
//!
//! `ConversationMessage` is the in-memory sum type. On the wire every message
//! is `{role, content}` where `content` is a string or an array of typed
//! parts; the conversion lives in `WireMessage`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::models::AircraftState;

/// Wire role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Resolution hint for an attached image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    High,
    #[default]
    Auto,
}

impl ImageDetail {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "high" => Some(Self::High),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default)]
    pub detail: ImageDetail,
}

impl ImageUrl {
    /// Embed JPEG bytes as a `data:` URL.
    pub fn from_jpeg(jpeg: &[u8], detail: ImageDetail) -> Self {
        Self {
            url: format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)),
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text of the content; parts are joined with newlines, images skipped.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Parts(parts) => parts
                .into_iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// Machine-readable snapshot of the aircraft sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// JSON-encoded `AircraftState`
    pub state: String,
    pub image: Option<ImageUrl>,
}

impl Observation {
    pub fn new(
        state: &AircraftState,
        jpeg: Option<&[u8]>,
        detail: ImageDetail,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            state: serde_json::to_string(state)?,
            image: jpeg.map(|bytes| ImageUrl::from_jpeg(bytes, detail)),
        })
    }
}

/// A reply from the model, or a synthetic turn written by the agent itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantMessage {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    /// Internal turn, hidden from the operator transcript. Never transmitted.
    pub control: bool,
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireMessage", try_from = "WireMessage")]
pub enum ConversationMessage {
    System { content: String },
    User { content: String },
    Observation(Observation),
    Assistant(AssistantMessage),
    Tool { tool_call_id: String, content: String },
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage {
            content: Some(content.into()),
            ..Default::default()
        })
    }

    /// Assistant turn written by the agent, not the model.
    pub fn control(content: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            control: true,
        })
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } | Self::Observation(_) => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant(_) => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    pub fn is_observation(&self) -> bool {
        matches!(self, Self::Observation(_))
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Self::Assistant(_))
    }

    /// Whether the operator transcript shows this message: user commands and
    /// the model's own replies only.
    pub fn is_visible(&self) -> bool {
        match self {
            Self::User { .. } => true,
            Self::Assistant(message) => !message.control,
            Self::System { .. } | Self::Observation(_) | Self::Tool { .. } => false,
        }
    }

    /// Plain text of the message, if it has any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::User { content } | Self::Tool { content, .. } => {
                Some(content.as_str())
            }
            Self::Assistant(message) => message.content.as_deref(),
            Self::Observation(observation) => Some(observation.state.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: Role, content: String) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(content)),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

impl From<ConversationMessage> for WireMessage {
    fn from(message: ConversationMessage) -> Self {
        match message {
            ConversationMessage::System { content } => Self::text(Role::System, content),
            ConversationMessage::User { content } => Self::text(Role::User, content),
            ConversationMessage::Observation(observation) => {
                let mut parts = vec![ContentPart::Text {
                    text: observation.state,
                }];
                if let Some(image_url) = observation.image {
                    parts.push(ContentPart::ImageUrl { image_url });
                }
                Self {
                    role: Role::System,
                    content: Some(MessageContent::Parts(parts)),
                    tool_calls: Vec::new(),
                    tool_call_id: None,
                }
            }
            ConversationMessage::Assistant(message) => Self {
                role: Role::Assistant,
                content: message.content.map(MessageContent::Text),
                tool_calls: message.tool_calls,
                tool_call_id: None,
            },
            ConversationMessage::Tool {
                tool_call_id,
                content,
            } => Self {
                role: Role::Tool,
                content: Some(MessageContent::Text(content)),
                tool_calls: Vec::new(),
                tool_call_id: Some(tool_call_id),
            },
        }
    }
}

impl TryFrom<WireMessage> for ConversationMessage {
    type Error = String;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        match wire.role {
            Role::System => match wire.content {
                Some(MessageContent::Text(content)) => Ok(Self::System { content }),
                Some(MessageContent::Parts(parts)) => {
                    let mut state = None;
                    let mut image = None;
                    for part in parts {
                        match part {
                            ContentPart::Text { text } if state.is_none() => state = Some(text),
                            ContentPart::ImageUrl { image_url } if image.is_none() => {
                                image = Some(image_url)
                            }
                            _ => {}
                        }
                    }
                    let state = state.ok_or("observation message has no text part")?;
                    Ok(Self::Observation(Observation { state, image }))
                }
                None => Err("system message has no content".to_string()),
            },
            Role::User => {
                let content = wire.content.ok_or("user message has no content")?;
                Ok(Self::User {
                    content: content.into_text(),
                })
            }
            Role::Assistant => Ok(Self::Assistant(AssistantMessage {
                content: wire.content.map(MessageContent::into_text),
                tool_calls: wire.tool_calls,
                control: false,
            })),
            Role::Tool => {
                let tool_call_id = wire.tool_call_id.ok_or("tool message has no tool_call_id")?;
                Ok(Self::Tool {
                    tool_call_id,
                    content: wire.content.map(MessageContent::into_text).unwrap_or_default(),
                })
            }
        }
    }
}

/// Body of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ConversationMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ConversationMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub message: ConversationMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Body of a chat-completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
}

impl CompletionResponse {
    /// Message of the first candidate.
    pub fn into_first_message(self) -> Option<ConversationMessage> {
        self.choices.into_iter().next().map(|choice| choice.message)
    }
}
