//! Driver seams for the stage-panel control surface.
//!
//! The panel never talks to hardware directly; it goes through the
//! traits in this crate. Real deployments plug in vendor drivers
//! behind these traits, tests and the default server binary use the
//! mocks.

pub mod camera;
pub mod error;
pub mod motor;

pub use camera::{CameraConnector, CameraControl, FrameSource};
pub use error::{DriverError, DriverResult};
pub use motor::MotorInterface;
