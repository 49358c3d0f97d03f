//! Command dispatcher: one UI value in, one driver call, one
//! notification out.
//!
//! Driver faults are surfaced as error notifications and go no
//! further: no retry, no re-raise, no secondary logging. A driver
//! that was absent at startup short-circuits every command for that
//! driver with a "module not loaded" error and never reaches the
//! hardware.

use crate::notify::{display_value, Notification};
use hardware::{CameraControl, MotorInterface};
use std::sync::Mutex;

/// A single panel command carrying the widget's numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move(f64),
    SetSpeed(f64),
    GetPosition,
    SetExposure(f64),
    SetGain(f64),
}

pub struct Dispatcher {
    motor: Option<Mutex<Box<dyn MotorInterface>>>,
    camera: Option<Mutex<Box<dyn CameraControl>>>,
}

impl Dispatcher {
    /// `None` for a driver marks it unavailable, as when the module
    /// failed to load at startup.
    pub fn new(
        motor: Option<Box<dyn MotorInterface>>,
        camera: Option<Box<dyn CameraControl>>,
    ) -> Self {
        Self {
            motor: motor.map(Mutex::new),
            camera: camera.map(Mutex::new),
        }
    }

    pub fn dispatch(&self, command: Command) -> Notification {
        tracing::debug!(?command, "dispatching");
        match command {
            Command::Move(position) => self.with_motor(|motor| match motor.move_to(position) {
                Ok(()) => Notification::success(format!(
                    "Motor move command sent for position: {}",
                    display_value(position)
                )),
                Err(e) => Notification::error(format!("Error moving motor: {e}")),
            }),
            Command::SetSpeed(speed) => self.with_motor(|motor| match motor.set_speed(speed) {
                Ok(()) => Notification::success(format!(
                    "Motor speed set to: {}",
                    display_value(speed)
                )),
                Err(e) => Notification::error(format!("Error setting motor speed: {e}")),
            }),
            Command::GetPosition => self.with_motor(|motor| match motor.get_position() {
                Ok(position) => Notification::info(format!(
                    "Current Motor Position: {}",
                    display_value(position)
                )),
                Err(e) => Notification::error(format!("Error getting motor position: {e}")),
            }),
            Command::SetExposure(exposure) => {
                self.with_camera(|camera| match camera.set_exposure(exposure) {
                    Ok(()) => Notification::success(format!(
                        "Exposure time set to: {} us",
                        display_value(exposure)
                    )),
                    Err(e) => Notification::error(format!("Error setting exposure time: {e}")),
                })
            }
            Command::SetGain(gain) => self.with_camera(|camera| match camera.set_gain(gain) {
                Ok(()) => Notification::success(format!("Gain set to: {}", display_value(gain))),
                Err(e) => Notification::error(format!("Error setting gain: {e}")),
            }),
        }
    }

    fn with_motor(
        &self,
        f: impl FnOnce(&mut dyn MotorInterface) -> Notification,
    ) -> Notification {
        match &self.motor {
            Some(motor) => f(motor.lock().unwrap().as_mut()),
            None => Notification::error("Motor module not loaded."),
        }
    }

    fn with_camera(
        &self,
        f: impl FnOnce(&mut dyn CameraControl) -> Notification,
    ) -> Notification {
        match &self.camera {
            Some(camera) => f(camera.lock().unwrap().as_mut()),
            None => Notification::error("Camera module not loaded."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Level;
    use hardware::camera::MockCameraControl;
    use hardware::motor::MockMotor;
    use std::sync::atomic::Ordering;

    fn full_dispatcher(motor: MockMotor, camera: MockCameraControl) -> Dispatcher {
        Dispatcher::new(Some(Box::new(motor)), Some(Box::new(camera)))
    }

    #[test]
    fn move_success_carries_the_exact_value() {
        let motor = MockMotor::new();
        let calls = motor.calls();
        let dispatcher = full_dispatcher(motor, MockCameraControl::new());

        let n = dispatcher.dispatch(Command::Move(20.0));
        assert_eq!(n.level, Level::Success);
        assert_eq!(n.text, "Motor move command sent for position: 20.0");
        assert_eq!(calls.moves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn move_fault_surfaces_the_driver_message() {
        let dispatcher = full_dispatcher(MockMotor::failing("axis stalled"), MockCameraControl::new());
        let n = dispatcher.dispatch(Command::Move(20.0));
        assert_eq!(n.level, Level::Error);
        assert_eq!(n.text, "Error moving motor: axis stalled");
    }

    #[test]
    fn speed_success_and_fault() {
        let dispatcher = full_dispatcher(MockMotor::new(), MockCameraControl::new());
        let n = dispatcher.dispatch(Command::SetSpeed(5.0));
        assert_eq!(n.level, Level::Success);
        assert_eq!(n.text, "Motor speed set to: 5.0");

        let dispatcher = full_dispatcher(MockMotor::failing("bad speed"), MockCameraControl::new());
        let n = dispatcher.dispatch(Command::SetSpeed(5.0));
        assert_eq!(n.text, "Error setting motor speed: bad speed");
    }

    #[test]
    fn position_readback_is_an_info_notification() {
        let dispatcher = full_dispatcher(MockMotor::at_position(10.5), MockCameraControl::new());
        let n = dispatcher.dispatch(Command::GetPosition);
        assert_eq!(n.level, Level::Info);
        assert_eq!(n.text, "Current Motor Position: 10.5");
    }

    #[test]
    fn position_fault_surfaces_the_driver_message() {
        let dispatcher = full_dispatcher(MockMotor::failing("encoder offline"), MockCameraControl::new());
        let n = dispatcher.dispatch(Command::GetPosition);
        assert_eq!(n.level, Level::Error);
        assert_eq!(n.text, "Error getting motor position: encoder offline");
    }

    #[test]
    fn exposure_success_carries_units() {
        let camera = MockCameraControl::new();
        let calls = camera.calls();
        let dispatcher = full_dispatcher(MockMotor::new(), camera);

        let n = dispatcher.dispatch(Command::SetExposure(1000.0));
        assert_eq!(n.level, Level::Success);
        assert_eq!(n.text, "Exposure time set to: 1000.0 us");
        assert_eq!(calls.exposures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exposure_fault_surfaces_the_driver_message() {
        let dispatcher = full_dispatcher(MockMotor::new(), MockCameraControl::failing("out of range"));
        let n = dispatcher.dispatch(Command::SetExposure(1000.0));
        assert_eq!(n.level, Level::Error);
        assert_eq!(n.text, "Error setting exposure time: out of range");
    }

    #[test]
    fn gain_success_and_fault() {
        let dispatcher = full_dispatcher(MockMotor::new(), MockCameraControl::new());
        let n = dispatcher.dispatch(Command::SetGain(1.5));
        assert_eq!(n.level, Level::Success);
        assert_eq!(n.text, "Gain set to: 1.5");

        let dispatcher = full_dispatcher(MockMotor::new(), MockCameraControl::failing("gain too high"));
        let n = dispatcher.dispatch(Command::SetGain(99.0));
        assert_eq!(n.text, "Error setting gain: gain too high");
    }

    #[test]
    fn missing_motor_short_circuits_without_touching_the_camera() {
        let camera = MockCameraControl::new();
        let camera_calls = camera.calls();
        let dispatcher = Dispatcher::new(None, Some(Box::new(camera)));

        for command in [Command::Move(1.0), Command::SetSpeed(1.0), Command::GetPosition] {
            let n = dispatcher.dispatch(command);
            assert_eq!(n.level, Level::Error);
            assert_eq!(n.text, "Motor module not loaded.");
        }
        assert_eq!(camera_calls.total(), 0);
    }

    #[test]
    fn missing_camera_short_circuits_without_touching_the_motor() {
        let motor = MockMotor::new();
        let motor_calls = motor.calls();
        let dispatcher = Dispatcher::new(Some(Box::new(motor)), None);

        for command in [Command::SetExposure(100.0), Command::SetGain(1.0)] {
            let n = dispatcher.dispatch(command);
            assert_eq!(n.level, Level::Error);
            assert_eq!(n.text, "Camera module not loaded.");
        }
        assert_eq!(motor_calls.total(), 0);
    }
}
