use super::{CameraConnector, CameraControl, Frame, FrameSource};
use crate::error::{DriverError, DriverResult};
use ndarray::Array2;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Call counts for a [`MockCameraControl`], shared like
/// [`crate::motor::mock::MotorCalls`].
#[derive(Debug, Default)]
pub struct CameraCalls {
    pub exposures: AtomicU32,
    pub gains: AtomicU32,
}

impl CameraCalls {
    pub fn total(&self) -> u32 {
        self.exposures.load(Ordering::SeqCst) + self.gains.load(Ordering::SeqCst)
    }
}

/// In-memory camera control surface with call counters and scripted
/// faults, mirroring [`crate::motor::MockMotor`].
pub struct MockCameraControl {
    exposure_us: f64,
    gain: f64,
    fault: Option<String>,
    calls: Arc<CameraCalls>,
}

impl MockCameraControl {
    pub fn new() -> Self {
        Self {
            exposure_us: 100_000.0,
            gain: 0.0,
            fault: None,
            calls: Arc::new(CameraCalls::default()),
        }
    }

    /// A control surface whose every call raises `msg`.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            fault: Some(msg.into()),
            ..Self::new()
        }
    }

    /// Shared handle on this camera's call counts.
    pub fn calls(&self) -> Arc<CameraCalls> {
        Arc::clone(&self.calls)
    }

    fn check_fault(&self) -> DriverResult<()> {
        match &self.fault {
            Some(msg) => Err(DriverError::fault(msg.clone())),
            None => Ok(()),
        }
    }

    pub fn exposure_us(&self) -> f64 {
        self.exposure_us
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }
}

impl Default for MockCameraControl {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraControl for MockCameraControl {
    fn set_exposure(&mut self, exposure_us: f64) -> DriverResult<()> {
        self.calls.exposures.fetch_add(1, Ordering::SeqCst);
        self.check_fault()?;
        self.exposure_us = exposure_us;
        Ok(())
    }

    fn set_gain(&mut self, gain: f64) -> DriverResult<()> {
        self.calls.gains.fetch_add(1, Ordering::SeqCst);
        self.check_fault()?;
        self.gain = gain;
        Ok(())
    }
}

/// One scripted acquisition result.
pub enum AcquireOutcome {
    Frame(Frame),
    Empty,
    Fault(String),
}

/// Frame connection that either replays a script or repeats one frame.
///
/// The close counter is shared so a test can keep a handle on it after
/// the source has been boxed and moved into the session under test.
pub struct MockFrameSource {
    script: VecDeque<AcquireOutcome>,
    repeat: Option<Frame>,
    closes: Arc<AtomicU32>,
    acquires: Arc<AtomicU32>,
}

impl MockFrameSource {
    /// Replays `script` in order; once exhausted, yields no frames.
    pub fn scripted(script: Vec<AcquireOutcome>) -> Self {
        Self {
            script: script.into(),
            repeat: None,
            closes: Arc::new(AtomicU32::new(0)),
            acquires: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Hands out `frame` on every acquisition.
    pub fn repeating(frame: Frame) -> Self {
        Self {
            script: VecDeque::new(),
            repeat: Some(frame),
            closes: Arc::new(AtomicU32::new(0)),
            acquires: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Repeats a synthetic Gaussian-spot frame of the given size.
    pub fn test_pattern(width: usize, height: usize) -> Self {
        Self::repeating(test_pattern_frame(width, height))
    }

    /// Shared counter of `close()` calls on this source.
    pub fn close_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.closes)
    }

    /// Shared counter of `acquire_frame()` calls on this source.
    pub fn acquire_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.acquires)
    }
}

impl FrameSource for MockFrameSource {
    fn acquire_frame(&mut self) -> DriverResult<Option<Frame>> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(AcquireOutcome::Frame(frame)) => Ok(Some(frame)),
            Some(AcquireOutcome::Empty) => Ok(None),
            Some(AcquireOutcome::Fault(msg)) => Err(DriverError::fault(msg)),
            None => Ok(self.repeat.clone()),
        }
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Synthetic frame with a bright Gaussian spot in the center, bright
/// enough to survive the panel's 8-bit downscaling visibly.
pub fn test_pattern_frame(width: usize, height: usize) -> Frame {
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;
    let sigma = (width.min(height).max(1) as f64) / 8.0;
    Array2::from_shape_fn((height, width), |(row, col)| {
        let dx = col as f64 - cx;
        let dy = row as f64 - cy;
        let value = 60_000.0 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
        value as u16
    })
}

enum ConnectorMode {
    Unavailable,
    Pattern { width: usize, height: usize },
    Scripted(Mutex<VecDeque<MockFrameSource>>),
}

/// Connector for tests and the default server binary.
pub struct MockCameraConnector {
    mode: ConnectorMode,
    connects: AtomicU32,
}

impl MockCameraConnector {
    /// Every `connect()` returns `None`.
    pub fn unavailable() -> Self {
        Self {
            mode: ConnectorMode::Unavailable,
            connects: AtomicU32::new(0),
        }
    }

    /// Every `connect()` yields a fresh test-pattern source.
    pub fn with_test_pattern(width: usize, height: usize) -> Self {
        Self {
            mode: ConnectorMode::Pattern { width, height },
            connects: AtomicU32::new(0),
        }
    }

    /// Hands out `sources` in order; exhausted connects return `None`.
    pub fn with_sources(sources: Vec<MockFrameSource>) -> Self {
        Self {
            mode: ConnectorMode::Scripted(Mutex::new(sources.into())),
            connects: AtomicU32::new(0),
        }
    }

    pub fn connect_calls(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

impl CameraConnector for MockCameraConnector {
    fn connect(&self) -> Option<Box<dyn FrameSource>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            ConnectorMode::Unavailable => None,
            ConnectorMode::Pattern { width, height } => {
                Some(Box::new(MockFrameSource::test_pattern(*width, *height)))
            }
            ConnectorMode::Scripted(queue) => {
                let source = queue.lock().unwrap().pop_front()?;
                Some(Box::new(source))
            }
        }
    }
}
