//! Flight instructions and the parser that pulls them out of model replies.
//!
//! The model answers in free text with a JSON object somewhere inside it.
//! Extraction takes everything from the first `{` to the last `}`; this
//! tolerates prose before and after the object but is fooled by stray braces
//! in the prose itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::Controls;

/// A single-use command for the flight actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    TakeOff,
    Land,
    Control(Controls),
    /// All sticks to neutral.
    Stop,
}

impl Instruction {
    /// Stick setpoints this instruction writes, if any.
    pub fn controls(&self) -> Option<Controls> {
        match self {
            Self::Control(controls) => Some(*controls),
            Self::Stop => Some(Controls::NEUTRAL),
            Self::TakeOff | Self::Land => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TakeOff => "take_off",
            Self::Land => "land",
            Self::Control(_) => "control",
            Self::Stop => "stop",
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("instruction payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("instruction payload has no string \"type\" field")]
    MissingType,

    #[error("unrecognized instruction type: {0}")]
    UnrecognizedInstruction(String),

    #[error("invalid stick positions in control instruction: {0}")]
    InvalidControl(#[source] serde_json::Error),
}

/// Slice of `reply` from the first `{` to the last `}` inclusive.
///
/// Returns `None` when either brace is missing or the last `}` comes before
/// the first `{`.
pub fn extract_instruction_payload(reply: &str) -> Option<&str> {
    let left = reply.find('{')?;
    let right = reply.rfind('}')?;
    if right < left {
        return None;
    }
    Some(&reply[left..=right])
}

/// Decode a JSON payload into an instruction, dispatching on `"type"`.
pub fn decode_instruction(payload: &str) -> Result<Instruction, ParseError> {
    let value: Value = serde_json::from_str(payload).map_err(ParseError::InvalidJson)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingType)?;

    match kind {
        "take_off" => Ok(Instruction::TakeOff),
        "land" => Ok(Instruction::Land),
        "stop" => Ok(Instruction::Stop),
        "control" => Controls::deserialize(&value)
            .map(Instruction::Control)
            .map_err(ParseError::InvalidControl),
        other => Err(ParseError::UnrecognizedInstruction(other.to_string())),
    }
}

/// Extract and decode in one step. `Ok(None)` means the reply carried no
/// instruction at all, which is different from a payload that fails to decode.
pub fn parse_reply(reply: &str) -> Result<Option<Instruction>, ParseError> {
    extract_instruction_payload(reply)
        .map(decode_instruction)
        .transpose()
}
