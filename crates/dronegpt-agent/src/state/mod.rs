//! Shared state read by the agent loop and written by ingest callbacks.

pub mod telemetry;
pub mod vision;

pub use telemetry::TelemetryStore;
pub use vision::VisionFeed;
