//! Motorized stage interface.

pub mod mock;

use crate::error::DriverResult;

pub use mock::{MockMotor, MotorCalls};

/// Interface for the motorized stage.
///
/// Each method maps to exactly one command on the controller. Units
/// are whatever the underlying controller uses; the panel passes
/// values through untouched.
pub trait MotorInterface: Send + Sync {
    /// Command an absolute move to `position`.
    fn move_to(&mut self, position: f64) -> DriverResult<()>;

    /// Set the stage travel speed.
    fn set_speed(&mut self, speed: f64) -> DriverResult<()>;

    /// Read back the current stage position.
    fn get_position(&mut self) -> DriverResult<f64>;
}
