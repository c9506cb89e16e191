//! Flight-controller keys and the values stored under them.

use dronegpt_core::{StickPosition, TelemetrySample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightControllerKey {
    /// Read: longitude, latitude, altitude.
    AircraftLocation3D,
    /// Read: NED velocity.
    AircraftVelocity,
    /// Read: degrees, north 0, range [-180, 180].
    CompassHeading,
    /// Read/write: return-to-home point.
    HomeLocation,
    /// Write: left virtual stick.
    VirtualStickLeft,
    /// Write: right virtual stick.
    VirtualStickRight,
    /// Action
    StartTakeoff,
    /// Action
    StartAutoLanding,
}

impl FlightControllerKey {
    pub fn is_action(&self) -> bool {
        matches!(self, Self::StartTakeoff | Self::StartAutoLanding)
    }

    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            Self::HomeLocation | Self::VirtualStickLeft | Self::VirtualStickRight
        )
    }

    /// Whether `value` has the shape this key stores.
    pub fn accepts(&self, value: &KeyValue) -> bool {
        matches!(
            (self, value),
            (Self::AircraftLocation3D, KeyValue::Location3D(_))
                | (Self::AircraftVelocity, KeyValue::Velocity3D(_))
                | (Self::CompassHeading, KeyValue::Heading(_))
                | (Self::HomeLocation, KeyValue::Location2D(_))
                | (Self::VirtualStickLeft, KeyValue::Stick(_))
                | (Self::VirtualStickRight, KeyValue::Stick(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location3D {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationCoordinate2D {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue {
    Location3D(Location3D),
    Velocity3D(Velocity3D),
    Heading(f64),
    Location2D(LocationCoordinate2D),
    Stick(StickPosition),
}

impl KeyValue {
    /// Telemetry sample carried by this value, for the keys that are telemetry.
    pub fn to_sample(&self) -> Option<TelemetrySample> {
        match *self {
            Self::Location3D(location) => Some(TelemetrySample::Position {
                longitude: location.longitude,
                latitude: location.latitude,
                altitude: location.altitude,
            }),
            Self::Velocity3D(velocity) => Some(TelemetrySample::Velocity {
                x: velocity.x,
                y: velocity.y,
                z: velocity.z,
            }),
            Self::Heading(heading) => Some(TelemetrySample::CompassHeading(heading)),
            Self::Location2D(_) | Self::Stick(_) => None,
        }
    }
}

/// A change notification from the flight controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyUpdate {
    pub key: FlightControllerKey,
    pub value: KeyValue,
}
