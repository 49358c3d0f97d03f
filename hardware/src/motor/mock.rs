use crate::error::{DriverError, DriverResult};
use crate::motor::MotorInterface;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Call counts for a [`MockMotor`].
///
/// Shared through an `Arc` so a test can keep observing after the
/// mock has been boxed and handed to the code under test.
#[derive(Debug, Default)]
pub struct MotorCalls {
    pub moves: AtomicU32,
    pub speeds: AtomicU32,
    pub positions: AtomicU32,
}

impl MotorCalls {
    pub fn total(&self) -> u32 {
        self.moves.load(Ordering::SeqCst)
            + self.speeds.load(Ordering::SeqCst)
            + self.positions.load(Ordering::SeqCst)
    }
}

/// In-memory stage for tests and the default server binary.
///
/// `failing()` makes every call raise the given fault instead.
pub struct MockMotor {
    position: f64,
    speed: f64,
    fault: Option<String>,
    calls: Arc<MotorCalls>,
}

impl MockMotor {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            speed: 1.0,
            fault: None,
            calls: Arc::new(MotorCalls::default()),
        }
    }

    pub fn at_position(position: f64) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    /// A motor whose every call raises `msg`.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            fault: Some(msg.into()),
            ..Self::new()
        }
    }

    /// Shared handle on this motor's call counts.
    pub fn calls(&self) -> Arc<MotorCalls> {
        Arc::clone(&self.calls)
    }

    fn check_fault(&self) -> DriverResult<()> {
        match &self.fault {
            Some(msg) => Err(DriverError::fault(msg.clone())),
            None => Ok(()),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

impl Default for MockMotor {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorInterface for MockMotor {
    fn move_to(&mut self, position: f64) -> DriverResult<()> {
        self.calls.moves.fetch_add(1, Ordering::SeqCst);
        self.check_fault()?;
        self.position = position;
        Ok(())
    }

    fn set_speed(&mut self, speed: f64) -> DriverResult<()> {
        self.calls.speeds.fetch_add(1, Ordering::SeqCst);
        self.check_fault()?;
        self.speed = speed;
        Ok(())
    }

    fn get_position(&mut self) -> DriverResult<f64> {
        self.calls.positions.fetch_add(1, Ordering::SeqCst);
        self.check_fault()?;
        Ok(self.position)
    }
}
