//! Background tasks.

pub mod agent_loop;
pub mod telemetry_loop;
pub mod vision_loop;
