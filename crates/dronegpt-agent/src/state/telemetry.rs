//! Latest known aircraft state.

use std::sync::{PoisonError, RwLock};

use dronegpt_core::{AircraftState, StickPosition, TelemetrySample};
use dronegpt_sdk::{FlightController, FlightControllerKey};

/// Keys read once at startup, before the change stream takes over.
const TELEMETRY_KEYS: [FlightControllerKey; 3] = [
    FlightControllerKey::AircraftLocation3D,
    FlightControllerKey::AircraftVelocity,
    FlightControllerKey::CompassHeading,
];

/// Thread-safe store for the aircraft state.
///
/// Each sample replaces its field group under a short write lock, so a
/// reader never sees half of a position or velocity.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    state: RwLock<AircraftState>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a sample into the current state.
    pub fn update(&self, sample: &TelemetrySample) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(sample);
    }

    /// Record the setpoint last written to one virtual stick. The other
    /// stick keeps its recorded value, neutral if none yet.
    pub fn record_stick(&self, key: FlightControllerKey, position: StickPosition) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut sticks = state.sticks.unwrap_or_default();
        match key {
            FlightControllerKey::VirtualStickLeft => sticks.left_stick = position,
            FlightControllerKey::VirtualStickRight => sticks.right_stick = position,
            other => {
                tracing::warn!("Ignoring stick record for non-stick key {:?}", other);
                return;
            }
        }
        state.sticks = Some(sticks);
    }

    /// Copy of the current state for one loop iteration.
    pub fn snapshot(&self) -> AircraftState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Seed the store with whatever the controller already knows.
    pub fn prime(&self, controller: &dyn FlightController) {
        let mut primed = 0;
        for key in TELEMETRY_KEYS {
            if let Some(sample) = controller.get(key).and_then(|value| value.to_sample()) {
                self.update(&sample);
                primed += 1;
            }
        }
        tracing::debug!("Primed telemetry store with {} of {} keys", primed, TELEMETRY_KEYS.len());
    }
}
