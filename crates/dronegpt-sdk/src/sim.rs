//! Simulated aircraft and camera.
//!
//! Full stick deflection maps to a fixed rate on each axis, integrated every
//! tick. No inertia, wind or battery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dronegpt_core::{StickPosition, STICK_MAX};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::camera::{CameraStream, FrameFormat, RawFrame};
use crate::controller::{ActionHandle, FlightController, SdkError};
use crate::keys::{
    FlightControllerKey, KeyUpdate, KeyValue, Location3D, LocationCoordinate2D, Velocity3D,
};

const METERS_PER_DEGREE: f64 = 111_320.0;
const TAKEOFF_ALTITUDE_M: f64 = 1.2;
const MAX_HORIZONTAL_SPEED_MPS: f64 = 5.0;
const MAX_VERTICAL_SPEED_MPS: f64 = 2.0;
const MAX_YAW_RATE_DPS: f64 = 60.0;

/// In-memory flight controller.
pub struct SimulatedAircraft {
    values: DashMap<FlightControllerKey, KeyValue>,
    updates: broadcast::Sender<KeyUpdate>,
    airborne: AtomicBool,
}

impl SimulatedAircraft {
    /// Aircraft on the ground at `origin`, facing north.
    pub fn new(origin: LocationCoordinate2D) -> Arc<Self> {
        let (updates, _) = broadcast::channel(64);
        let values = DashMap::new();
        values.insert(
            FlightControllerKey::AircraftLocation3D,
            KeyValue::Location3D(Location3D {
                longitude: origin.longitude,
                latitude: origin.latitude,
                altitude: 0.0,
            }),
        );
        values.insert(
            FlightControllerKey::AircraftVelocity,
            KeyValue::Velocity3D(Velocity3D::default()),
        );
        values.insert(FlightControllerKey::CompassHeading, KeyValue::Heading(0.0));
        values.insert(FlightControllerKey::HomeLocation, KeyValue::Location2D(origin));
        values.insert(
            FlightControllerKey::VirtualStickLeft,
            KeyValue::Stick(StickPosition::NEUTRAL),
        );
        values.insert(
            FlightControllerKey::VirtualStickRight,
            KeyValue::Stick(StickPosition::NEUTRAL),
        );

        Arc::new(Self {
            values,
            updates,
            airborne: AtomicBool::new(false),
        })
    }

    pub fn is_airborne(&self) -> bool {
        self.airborne.load(Ordering::SeqCst)
    }

    /// Advance the simulation by `dt` and publish the new telemetry.
    pub fn step(&self, dt: Duration) {
        let dt = dt.as_secs_f64();
        let left = self.stick(FlightControllerKey::VirtualStickLeft);
        let right = self.stick(FlightControllerKey::VirtualStickRight);
        let mut location = self.location();
        let mut heading = match self.get(FlightControllerKey::CompassHeading) {
            Some(KeyValue::Heading(heading)) => heading,
            _ => 0.0,
        };

        let velocity = if self.is_airborne() {
            let yaw = axis(left.horizontal_position) * MAX_YAW_RATE_DPS * dt;
            heading = wrap_heading(heading + yaw);

            let forward = axis(right.vertical_position) * MAX_HORIZONTAL_SPEED_MPS;
            let sideways = axis(right.horizontal_position) * MAX_HORIZONTAL_SPEED_MPS;
            let (sin, cos) = heading.to_radians().sin_cos();
            let north = forward * cos - sideways * sin;
            let east = forward * sin + sideways * cos;
            let down = -axis(left.vertical_position) * MAX_VERTICAL_SPEED_MPS;

            location.latitude += north * dt / METERS_PER_DEGREE;
            location.longitude +=
                east * dt / (METERS_PER_DEGREE * location.latitude.to_radians().cos().max(1e-6));
            location.altitude = (location.altitude - down * dt).max(0.0);
            Velocity3D {
                x: north,
                y: east,
                z: down,
            }
        } else {
            Velocity3D::default()
        };

        self.publish(
            FlightControllerKey::AircraftLocation3D,
            KeyValue::Location3D(location),
        );
        self.publish(
            FlightControllerKey::AircraftVelocity,
            KeyValue::Velocity3D(velocity),
        );
        self.publish(FlightControllerKey::CompassHeading, KeyValue::Heading(heading));
    }

    /// Run the physics at a fixed tick until shutdown.
    pub fn spawn(
        self: &Arc<Self>,
        tick: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let aircraft = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(tick);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        tracing::info!("Simulated aircraft shutting down");
                        break;
                    }
                    _ = ticker.tick() => aircraft.step(tick),
                }
            }
        })
    }

    fn stick(&self, key: FlightControllerKey) -> StickPosition {
        match self.get(key) {
            Some(KeyValue::Stick(position)) => position,
            _ => StickPosition::NEUTRAL,
        }
    }

    fn location(&self) -> Location3D {
        match self.get(FlightControllerKey::AircraftLocation3D) {
            Some(KeyValue::Location3D(location)) => location,
            _ => Location3D {
                longitude: 0.0,
                latitude: 0.0,
                altitude: 0.0,
            },
        }
    }

    fn publish(&self, key: FlightControllerKey, value: KeyValue) {
        self.values.insert(key, value);
        // No listeners yet is fine.
        let _ = self.updates.send(KeyUpdate { key, value });
    }

    fn set_altitude(&self, altitude: f64) {
        let mut location = self.location();
        location.altitude = altitude;
        self.publish(
            FlightControllerKey::AircraftLocation3D,
            KeyValue::Location3D(location),
        );
    }
}

impl FlightController for SimulatedAircraft {
    fn get(&self, key: FlightControllerKey) -> Option<KeyValue> {
        self.values.get(&key).map(|entry| *entry.value())
    }

    fn set(&self, key: FlightControllerKey, value: KeyValue) -> Result<(), SdkError> {
        if !key.is_writable() {
            return Err(SdkError::ReadOnly(key));
        }
        if !key.accepts(&value) {
            return Err(SdkError::TypeMismatch(key));
        }
        self.values.insert(key, value);
        Ok(())
    }

    fn perform_action(&self, key: FlightControllerKey) -> ActionHandle {
        let result = match key {
            FlightControllerKey::StartTakeoff => {
                if self.airborne.swap(true, Ordering::SeqCst) {
                    Err(SdkError::Rejected("aircraft is already airborne".to_string()))
                } else {
                    self.set_altitude(TAKEOFF_ALTITUDE_M);
                    Ok(())
                }
            }
            FlightControllerKey::StartAutoLanding => {
                if self.airborne.swap(false, Ordering::SeqCst) {
                    self.set_altitude(0.0);
                    Ok(())
                } else {
                    Err(SdkError::Rejected("aircraft is on the ground".to_string()))
                }
            }
            other => Err(SdkError::NotAnAction(other)),
        };
        ActionHandle::ready(result)
    }

    fn listen(&self) -> broadcast::Receiver<KeyUpdate> {
        self.updates.subscribe()
    }
}

/// Synthetic camera rendering a gradient that shifts with heading and altitude.
pub struct SimulatedCamera {
    frames: watch::Sender<Option<RawFrame>>,
    width: u32,
    height: u32,
}

impl SimulatedCamera {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        let (frames, _) = watch::channel(None);
        Arc::new(Self {
            frames,
            width,
            height,
        })
    }

    pub fn publish(&self, frame: RawFrame) {
        self.frames.send_replace(Some(frame));
    }

    /// Render one RGBA frame for the aircraft's current pose.
    pub fn render(&self, aircraft: &SimulatedAircraft) -> RawFrame {
        let heading = match aircraft.get(FlightControllerKey::CompassHeading) {
            Some(KeyValue::Heading(heading)) => heading,
            _ => 0.0,
        };
        let altitude = aircraft.location().altitude;
        let shift = ((heading + 180.0) / 360.0 * self.width as f64) as u32;
        let horizon = (self.height as f64 * (0.5 + (altitude / 20.0).min(0.4))) as u32;

        let mut data = Vec::with_capacity(FrameFormat::Rgba8888.frame_len(self.width, self.height));
        for y in 0..self.height {
            for x in 0..self.width {
                let column = ((x + shift) % self.width.max(1)) * 255 / self.width.max(1);
                let pixel = if y < horizon {
                    [90, 150, 200 + (column / 5) as u8, 255]
                } else {
                    [60 + (column / 4) as u8, 110, 50, 255]
                };
                data.extend_from_slice(&pixel);
            }
        }
        RawFrame::new(data, FrameFormat::Rgba8888, self.width, self.height)
    }

    /// Publish frames at `period` until shutdown.
    pub fn spawn(
        self: &Arc<Self>,
        aircraft: Arc<SimulatedAircraft>,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let camera = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        tracing::info!("Simulated camera shutting down");
                        break;
                    }
                    _ = ticker.tick() => camera.publish(camera.render(&aircraft)),
                }
            }
        })
    }
}

impl CameraStream for SimulatedCamera {
    fn frames(&self) -> watch::Receiver<Option<RawFrame>> {
        self.frames.subscribe()
    }
}

fn axis(value: i32) -> f64 {
    value.clamp(-STICK_MAX, STICK_MAX) as f64 / STICK_MAX as f64
}

fn wrap_heading(heading: f64) -> f64 {
    let wrapped = (heading + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}
