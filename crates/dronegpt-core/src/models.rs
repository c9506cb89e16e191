//! Core data models for aircraft state and stick setpoints.

use serde::{Deserialize, Serialize};

/// Full travel of a virtual stick axis in either direction.
pub const STICK_MAX: i32 = 660;

/// Setpoint for one virtual joystick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickPosition {
    pub vertical_position: i32,
    pub horizontal_position: i32,
}

impl StickPosition {
    pub const NEUTRAL: Self = Self {
        vertical_position: 0,
        horizontal_position: 0,
    };

    pub fn new(vertical_position: i32, horizontal_position: i32) -> Self {
        Self {
            vertical_position,
            horizontal_position,
        }
    }

    /// Both axes inside `[-STICK_MAX, STICK_MAX]`.
    pub fn in_range(&self) -> bool {
        (-STICK_MAX..=STICK_MAX).contains(&self.vertical_position)
            && (-STICK_MAX..=STICK_MAX).contains(&self.horizontal_position)
    }

    /// Copy of this position with both axes limited to stick travel.
    pub fn clamped(self) -> Self {
        Self {
            vertical_position: self.vertical_position.clamp(-STICK_MAX, STICK_MAX),
            horizontal_position: self.horizontal_position.clamp(-STICK_MAX, STICK_MAX),
        }
    }
}

/// Left and right stick setpoints.
///
/// Left stick: vertical is throttle (climb/descend), horizontal is yaw.
/// Right stick: vertical is pitch (forward/back), horizontal is roll (left/right).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Controls {
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
}

impl Controls {
    pub const NEUTRAL: Self = Self {
        left_stick: StickPosition::NEUTRAL,
        right_stick: StickPosition::NEUTRAL,
    };

    pub fn new(left_stick: StickPosition, right_stick: StickPosition) -> Self {
        Self {
            left_stick,
            right_stick,
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    pub fn in_range(&self) -> bool {
        self.left_stick.in_range() && self.right_stick.in_range()
    }

    pub fn clamped(self) -> Self {
        Self {
            left_stick: self.left_stick.clamped(),
            right_stick: self.right_stick.clamped(),
        }
    }
}

/// Latest known state of the aircraft.
///
/// Every field is `None` until the first sample for it arrives. Serialized
/// with camelCase keys and absent fields omitted; this is the text the model
/// sees in each observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftState {
    /// Degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Meters above take-off point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// North component of NED velocity (m/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_velocity: Option<f64>,
    /// East component of NED velocity (m/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_velocity: Option<f64>,
    /// Down component of NED velocity (m/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_velocity: Option<f64>,
    /// North is 0, east is 90. Range [-180, 180].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compass_heading: Option<f64>,
    /// Last commanded stick positions (not sensed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticks: Option<Controls>,
}

impl AircraftState {
    /// Merge a partial sample into this state. Fields the sample does not
    /// carry are left untouched.
    pub fn apply(&mut self, sample: &TelemetrySample) {
        match *sample {
            TelemetrySample::Position {
                longitude,
                latitude,
                altitude,
            } => {
                self.longitude = Some(longitude);
                self.latitude = Some(latitude);
                self.altitude = Some(altitude);
            }
            TelemetrySample::Velocity { x, y, z } => {
                self.x_velocity = Some(x);
                self.y_velocity = Some(y);
                self.z_velocity = Some(z);
            }
            TelemetrySample::CompassHeading(heading) => {
                self.compass_heading = Some(heading);
            }
        }
    }

    /// Longitude/latitude pair, if both are known.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.longitude.zip(self.latitude)
    }
}

/// One observation from the sensor subsystem. Each variant covers a group of
/// fields that the flight controller reports together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetrySample {
    Position {
        longitude: f64,
        latitude: f64,
        altitude: f64,
    },
    Velocity {
        x: f64,
        y: f64,
        z: f64,
    },
    CompassHeading(f64),
}
