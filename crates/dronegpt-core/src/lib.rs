//! DroneGPT core - domain types for the autonomous flight agent.
//!
//! Everything in this crate is pure: no I/O, no clocks, no runtime.

pub mod chat;
pub mod context;
pub mod instruction;
pub mod log;
pub mod models;
pub mod prompt;

pub use chat::{
    AssistantMessage, Choice, CompletionRequest, CompletionResponse, ContentPart,
    ConversationMessage, FunctionCall, ImageDetail, ImageUrl, MessageContent, Observation, Role,
    ToolCall,
};
pub use context::{select_context, ContextError};
pub use instruction::{
    decode_instruction, extract_instruction_payload, parse_reply, Instruction, ParseError,
};
pub use log::{ConversationError, ConversationLog};
pub use models::{AircraftState, Controls, StickPosition, TelemetrySample, STICK_MAX};
pub use prompt::SYSTEM_PROMPT;
