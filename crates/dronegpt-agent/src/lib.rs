//! DroneGPT agent - closed-loop flight control through a language model
//!
//! Wires the model client, the aircraft and the camera together: telemetry
//! and frames are ingested in the background, and each operator command
//! starts a run of the agent loop until the model stops issuing instructions.

pub mod actuator;
pub mod agent;
pub mod config;
pub mod error;
pub mod loops;
pub mod pacing;
pub mod state;

pub use actuator::FlightActuator;
pub use agent::Agent;
pub use config::Config;
pub use error::{ActuatorError, AgentError, VisionError};
pub use loops::agent_loop::{
    run_agent_loop, AgentContext, LoopState, RunOutcome, RunSummary, STOP_CONTROL_MESSAGE,
};
pub use state::{TelemetryStore, VisionFeed};
