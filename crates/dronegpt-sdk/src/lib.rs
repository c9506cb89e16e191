//! DroneGPT SDK - aircraft integration surface
//!
//! The agent talks to the aircraft only through the traits defined here: a
//! key/value flight controller and a camera frame stream. `sim` provides
//! implementations that run without hardware.

pub mod camera;
pub mod controller;
pub mod keys;
pub mod sim;

pub use camera::{CameraStream, FrameFormat, RawFrame};
pub use controller::{ActionCompleter, ActionHandle, FlightController, SdkError};
pub use keys::{
    FlightControllerKey, KeyUpdate, KeyValue, Location3D, LocationCoordinate2D, Velocity3D,
};
pub use sim::{SimulatedAircraft, SimulatedCamera};
