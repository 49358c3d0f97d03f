//! Camera interface split along the seams the panel actually uses.
//!
//! Exposure/gain commands go to the camera's control surface, while
//! frame acquisition goes through a per-stream connection. The two are
//! separate traits because the panel treats them as separate
//! collaborators: control commands work whether or not a stream is
//! open, and a stream handle is connected and released per session.

pub mod mock;

use crate::error::DriverResult;
use ndarray::Array2;

pub use mock::{
    AcquireOutcome, CameraCalls, MockCameraConnector, MockCameraControl, MockFrameSource,
};

/// Raw sensor frame, row-major, one `u16` per pixel.
pub type Frame = Array2<u16>;

/// Camera configuration commands.
pub trait CameraControl: Send + Sync {
    /// Set exposure time in microseconds.
    fn set_exposure(&mut self, exposure_us: f64) -> DriverResult<()>;

    /// Set analog gain.
    fn set_gain(&mut self, gain: f64) -> DriverResult<()>;
}

/// An open connection that frames can be pulled from.
///
/// `Send` so acquisition can be pushed onto a blocking worker thread.
pub trait FrameSource: Send {
    /// Pull one frame.
    ///
    /// `Ok(None)` means the driver had no frame to hand over; that is
    /// not a fault and callers decide how to report it.
    fn acquire_frame(&mut self) -> DriverResult<Option<Frame>>;

    /// Release the connection. Safe to call more than once.
    fn close(&mut self);
}

/// Opens frame connections on demand.
///
/// Returns `None` when no camera connection is available, which the
/// panel reports without treating it as a driver fault.
pub trait CameraConnector: Send + Sync {
    fn connect(&self) -> Option<Box<dyn FrameSource>>;
}
