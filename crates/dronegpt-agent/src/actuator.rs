//! Applies instructions to the aircraft.

use std::sync::Arc;
use std::time::Duration;

use dronegpt_core::{AircraftState, Controls, Instruction};
use dronegpt_sdk::{FlightController, FlightControllerKey, KeyValue, LocationCoordinate2D};

use crate::error::ActuatorError;
use crate::state::TelemetryStore;

/// Writes instructions to the flight controller and mirrors stick setpoints
/// into the telemetry store.
pub struct FlightActuator {
    controller: Arc<dyn FlightController>,
    telemetry: Arc<TelemetryStore>,
    action_timeout: Option<Duration>,
}

impl FlightActuator {
    /// With `action_timeout` unset, take-off and landing return as soon as
    /// the command is issued and their outcome is only logged.
    pub fn new(
        controller: Arc<dyn FlightController>,
        telemetry: Arc<TelemetryStore>,
        action_timeout: Option<Duration>,
    ) -> Self {
        Self {
            controller,
            telemetry,
            action_timeout,
        }
    }

    /// Apply one instruction. `snapshot` is the state the instruction was
    /// decided on; take-off records its coordinates as home.
    pub async fn execute(
        &self,
        instruction: &Instruction,
        snapshot: &AircraftState,
    ) -> Result<(), ActuatorError> {
        tracing::info!("Executing {}", instruction.name());
        match instruction {
            Instruction::TakeOff => {
                self.set_home(snapshot)?;
                self.perform(FlightControllerKey::StartTakeoff, "take-off").await
            }
            Instruction::Land => {
                self.perform(FlightControllerKey::StartAutoLanding, "landing")
                    .await
            }
            Instruction::Control(controls) => self.write_sticks(*controls),
            Instruction::Stop => self.stop(),
        }
    }

    /// Neutral sticks. Used whenever the loop has no valid next step.
    pub fn stop(&self) -> Result<(), ActuatorError> {
        self.write_sticks(Controls::NEUTRAL)
    }

    /// Both sticks are always attempted. Each one is mirrored only once its
    /// own write succeeds; the first failure is returned afterwards.
    fn write_sticks(&self, controls: Controls) -> Result<(), ActuatorError> {
        let clamped = controls.clamped();
        if clamped != controls {
            tracing::warn!("Clamped stick setpoints {:?} to {:?}", controls, clamped);
        }

        let mut first_err = None;
        for (key, position) in [
            (FlightControllerKey::VirtualStickLeft, clamped.left_stick),
            (FlightControllerKey::VirtualStickRight, clamped.right_stick),
        ] {
            match self.controller.set(key, KeyValue::Stick(position)) {
                Ok(()) => self.telemetry.record_stick(key, position),
                Err(err) => {
                    tracing::warn!("Failed to write {:?}: {}", key, err);
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn set_home(&self, snapshot: &AircraftState) -> Result<(), ActuatorError> {
        match snapshot.coordinates() {
            Some((longitude, latitude)) => {
                self.controller.set(
                    FlightControllerKey::HomeLocation,
                    KeyValue::Location2D(LocationCoordinate2D {
                        longitude,
                        latitude,
                    }),
                )?;
                tracing::info!("Home location set to ({:.6}, {:.6})", latitude, longitude);
            }
            None => tracing::warn!("Position unknown, taking off without updating home location"),
        }
        Ok(())
    }

    async fn perform(
        &self,
        key: FlightControllerKey,
        action: &'static str,
    ) -> Result<(), ActuatorError> {
        let handle = self.controller.perform_action(key);

        let Some(timeout) = self.action_timeout else {
            tokio::spawn(async move {
                match handle.outcome().await {
                    Ok(()) => tracing::info!("{} succeeded", action),
                    Err(err) => tracing::warn!("{} failed: {}", action, err),
                }
            });
            return Ok(());
        };

        match tokio::time::timeout(timeout, handle.outcome()).await {
            Ok(Ok(())) => {
                tracing::info!("{} succeeded", action);
                Ok(())
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(ActuatorError::ActionTimeout { action, timeout }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronegpt_core::StickPosition;
    use dronegpt_sdk::{ActionHandle, KeyUpdate, SdkError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::sync::broadcast;

    #[derive(Default)]
    struct Recorder {
        writes: Mutex<Vec<(FlightControllerKey, KeyValue)>>,
        actions: Mutex<Vec<FlightControllerKey>>,
        hang: bool,
        reject_left: AtomicBool,
    }

    impl FlightController for Recorder {
        fn get(&self, _key: FlightControllerKey) -> Option<KeyValue> {
            None
        }

        fn set(&self, key: FlightControllerKey, value: KeyValue) -> Result<(), SdkError> {
            if key == FlightControllerKey::VirtualStickLeft
                && self.reject_left.load(Ordering::SeqCst)
            {
                return Err(SdkError::Rejected("link busy".into()));
            }
            self.writes.lock().unwrap().push((key, value));
            Ok(())
        }

        fn perform_action(&self, key: FlightControllerKey) -> ActionHandle {
            self.actions.lock().unwrap().push(key);
            if self.hang {
                let (completer, handle) = ActionHandle::pending();
                std::mem::forget(completer);
                handle
            } else {
                ActionHandle::ready(Err(SdkError::Rejected("motors locked".into())))
            }
        }

        fn listen(&self) -> broadcast::Receiver<KeyUpdate> {
            broadcast::channel(1).1
        }
    }

    fn actuator(
        recorder: Arc<Recorder>,
        timeout: Option<Duration>,
    ) -> (FlightActuator, Arc<TelemetryStore>) {
        let telemetry = Arc::new(TelemetryStore::new());
        (FlightActuator::new(recorder, telemetry.clone(), timeout), telemetry)
    }

    #[tokio::test]
    async fn test_take_off_sets_home_from_snapshot() {
        let recorder = Arc::new(Recorder::default());
        let (actuator, _) = actuator(recorder.clone(), None);
        let snapshot = AircraftState {
            longitude: Some(-117.8),
            latitude: Some(33.6),
            ..Default::default()
        };

        // Fire-and-forget: the rejection is only logged.
        actuator.execute(&Instruction::TakeOff, &snapshot).await.unwrap();

        let writes = recorder.writes.lock().unwrap();
        assert_eq!(
            writes.as_slice(),
            &[(
                FlightControllerKey::HomeLocation,
                KeyValue::Location2D(LocationCoordinate2D {
                    longitude: -117.8,
                    latitude: 33.6
                })
            )]
        );
        assert_eq!(
            recorder.actions.lock().unwrap().as_slice(),
            &[FlightControllerKey::StartTakeoff]
        );
    }

    #[tokio::test]
    async fn test_awaited_action_reports_rejection() {
        let recorder = Arc::new(Recorder::default());
        let (actuator, _) = actuator(recorder, Some(Duration::from_secs(1)));
        let err = actuator
            .execute(&Instruction::Land, &AircraftState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActuatorError::Sdk(SdkError::Rejected(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_awaited_action_times_out() {
        let recorder = Arc::new(Recorder {
            hang: true,
            ..Default::default()
        });
        let (actuator, _) = actuator(recorder, Some(Duration::from_millis(500)));
        let err = actuator
            .execute(&Instruction::Land, &AircraftState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActuatorError::ActionTimeout { action: "landing", .. }));
    }

    #[tokio::test]
    async fn test_control_clamps_and_mirrors() {
        let recorder = Arc::new(Recorder::default());
        let (actuator, telemetry) = actuator(recorder.clone(), None);
        let requested = Controls::new(StickPosition::new(900, 0), StickPosition::new(-20, -700));

        actuator
            .execute(&Instruction::Control(requested), &AircraftState::default())
            .await
            .unwrap();

        let expected = Controls::new(StickPosition::new(660, 0), StickPosition::new(-20, -660));
        assert_eq!(telemetry.snapshot().sticks, Some(expected));
        assert_eq!(
            recorder.writes.lock().unwrap().as_slice(),
            &[
                (FlightControllerKey::VirtualStickLeft, KeyValue::Stick(expected.left_stick)),
                (FlightControllerKey::VirtualStickRight, KeyValue::Stick(expected.right_stick)),
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_neutralizes() {
        let recorder = Arc::new(Recorder::default());
        let (actuator, telemetry) = actuator(recorder, None);
        actuator
            .execute(&Instruction::Stop, &AircraftState::default())
            .await
            .unwrap();
        assert_eq!(telemetry.snapshot().sticks, Some(Controls::NEUTRAL));
    }

    #[tokio::test]
    async fn test_stop_neutralizes_right_stick_when_left_write_fails() {
        let recorder = Arc::new(Recorder::default());
        let (actuator, telemetry) = actuator(recorder.clone(), None);
        let controls = Controls::new(StickPosition::new(150, 0), StickPosition::new(400, 0));
        actuator
            .execute(&Instruction::Control(controls), &AircraftState::default())
            .await
            .unwrap();

        recorder.reject_left.store(true, Ordering::SeqCst);
        let err = actuator.stop().unwrap_err();
        assert!(matches!(err, ActuatorError::Sdk(SdkError::Rejected(_))));

        let last_right = recorder
            .writes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(key, _)| *key == FlightControllerKey::VirtualStickRight)
            .map(|(_, value)| *value);
        assert_eq!(last_right, Some(KeyValue::Stick(StickPosition::NEUTRAL)));

        // Right stick mirrors its neutral write; left keeps its last accepted value.
        let sticks = telemetry.snapshot().sticks.unwrap();
        assert_eq!(sticks.right_stick, StickPosition::NEUTRAL);
        assert_eq!(sticks.left_stick, StickPosition::new(150, 0));
    }

    #[tokio::test]
    async fn test_failed_left_write_still_mirrors_right() {
        let recorder = Arc::new(Recorder::default());
        recorder.reject_left.store(true, Ordering::SeqCst);
        let (actuator, telemetry) = actuator(recorder.clone(), None);
        let controls = Controls::new(StickPosition::new(200, 0), StickPosition::new(-300, 50));

        assert!(actuator
            .execute(&Instruction::Control(controls), &AircraftState::default())
            .await
            .is_err());

        assert_eq!(
            recorder.writes.lock().unwrap().as_slice(),
            &[(
                FlightControllerKey::VirtualStickRight,
                KeyValue::Stick(StickPosition::new(-300, 50))
            )]
        );
        let sticks = telemetry.snapshot().sticks.unwrap();
        assert_eq!(sticks.right_stick, StickPosition::new(-300, 50));
        assert_eq!(sticks.left_stick, StickPosition::NEUTRAL);
    }
}
