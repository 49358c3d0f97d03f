//! Streaming session: a two-state machine (Idle / Streaming) owning
//! the camera handle for the stream's duration.
//!
//! Each refresh tick pulls one frame, offloaded to a blocking worker
//! so hardware I/O never blocks the executor. Stopping is cooperative:
//! the flag is observed at the start of the next tick, and a tick in
//! flight always completes.

use crate::frame::{encode_jpeg, EncodedFrame};
use crate::notify::Notification;
use hardware::camera::{CameraConnector, FrameSource};
use tracing::{debug, info};

/// Result of one refresh tick.
pub enum TickOutcome {
    /// Streaming flag was false; nothing happened.
    Idle,
    /// A frame was acquired and encoded.
    Frame(EncodedFrame),
    /// Non-fatal notice (no frame, or an encode hiccup); the session
    /// stays in Streaming.
    Notice(Notification),
    /// A driver fault ended the stream; the handle has been released.
    Fault(Notification),
}

pub struct StreamSession {
    streaming: bool,
    handle: Option<Box<dyn FrameSource>>,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            streaming: false,
            handle: None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Idle → Streaming. Connects a fresh handle; a start while
    /// already streaming reconnects, releasing the old handle first.
    pub fn start(&mut self, connector: &dyn CameraConnector) -> Notification {
        if let Some(mut old) = self.handle.take() {
            old.close();
        }

        match connector.connect() {
            Some(handle) => {
                self.handle = Some(handle);
                self.streaming = true;
                info!("camera stream started");
                Notification::info("Streaming started.")
            }
            None => {
                self.streaming = false;
                Notification::error("Could not connect to camera for streaming.")
            }
        }
    }

    /// Streaming → Idle. Idempotent: stopping twice is a no-op.
    pub fn stop(&mut self) -> Notification {
        self.streaming = false;
        if let Some(mut handle) = self.handle.take() {
            handle.close();
            info!("camera stream stopped");
        }
        Notification::info("Streaming stopped.")
    }

    /// Run one refresh tick.
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.streaming {
            return TickOutcome::Idle;
        }

        let Some(handle) = self.handle.take() else {
            // Flag and handle out of sync; treat as a stream fault.
            self.streaming = false;
            return TickOutcome::Fault(Notification::error(
                "Streaming is active but camera instance is not available.",
            ));
        };

        let mut handle = handle;
        let (handle, result) = match tokio::task::spawn_blocking(move || {
            let result = handle.acquire_frame();
            (handle, result)
        })
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                self.streaming = false;
                return TickOutcome::Fault(Notification::error(format!(
                    "Error during streaming: {e}"
                )));
            }
        };

        match result {
            Ok(Some(frame)) => {
                self.handle = Some(handle);
                match encode_jpeg(&frame) {
                    Ok(encoded) => TickOutcome::Frame(encoded),
                    Err(e) => {
                        debug!("stream encode failed: {e}");
                        TickOutcome::Notice(Notification::error(
                            "Could not encode frame to JPEG in stream.",
                        ))
                    }
                }
            }
            Ok(None) => {
                self.handle = Some(handle);
                TickOutcome::Notice(Notification::warning("No frame received"))
            }
            Err(e) => {
                let mut handle = handle;
                handle.close();
                self.streaming = false;
                TickOutcome::Fault(Notification::error(format!("Error during streaming: {e}")))
            }
        }
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Level;
    use hardware::camera::{AcquireOutcome, MockCameraConnector, MockFrameSource};
    use ndarray::Array2;
    use std::sync::atomic::Ordering;

    #[test]
    fn failed_connect_leaves_the_session_idle() {
        let mut session = StreamSession::new();
        let connector = MockCameraConnector::unavailable();

        let n = session.start(&connector);
        assert_eq!(n.level, Level::Error);
        assert_eq!(n.text, "Could not connect to camera for streaming.");
        assert!(!session.is_streaming());
    }

    #[test]
    fn start_takes_a_handle_and_sets_the_flag() {
        let mut session = StreamSession::new();
        let connector = MockCameraConnector::with_test_pattern(8, 8);

        let n = session.start(&connector);
        assert_eq!(n.level, Level::Info);
        assert!(session.is_streaming());
        assert_eq!(connector.connect_calls(), 1);
    }

    #[test]
    fn restart_releases_the_previous_handle() {
        let first = MockFrameSource::test_pattern(8, 8);
        let first_closes = first.close_counter();
        let second = MockFrameSource::test_pattern(8, 8);
        let connector = MockCameraConnector::with_sources(vec![first, second]);

        let mut session = StreamSession::new();
        session.start(&connector);
        session.start(&connector);

        assert!(session.is_streaming());
        assert_eq!(first_closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_releases_the_handle_and_is_idempotent() {
        let source = MockFrameSource::test_pattern(8, 8);
        let closes = source.close_counter();
        let connector = MockCameraConnector::with_sources(vec![source]);

        let mut session = StreamSession::new();
        session.start(&connector);
        assert!(session.is_streaming());

        session.stop();
        assert!(!session.is_streaming());
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        // Second stop: no fault, no second close.
        session.stop();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tick_while_idle_does_nothing() {
        let mut session = StreamSession::new();
        assert!(matches!(session.tick().await, TickOutcome::Idle));
    }

    #[tokio::test]
    async fn tick_yields_an_encoded_frame() {
        let connector = MockCameraConnector::with_test_pattern(16, 16);
        let mut session = StreamSession::new();
        session.start(&connector);

        match session.tick().await {
            TickOutcome::Frame(encoded) => {
                assert_eq!(encoded.width, 16);
                assert_eq!(&encoded.jpeg[0..2], &[0xFF, 0xD8]);
            }
            _ => panic!("expected a frame"),
        }
        assert!(session.is_streaming());
    }

    #[tokio::test]
    async fn empty_acquisition_warns_and_keeps_streaming() {
        let frame = Array2::<u16>::zeros((4, 4));
        let source = MockFrameSource::scripted(vec![
            AcquireOutcome::Empty,
            AcquireOutcome::Frame(frame),
        ]);
        let acquires = source.acquire_counter();
        let connector = MockCameraConnector::with_sources(vec![source]);

        let mut session = StreamSession::new();
        session.start(&connector);

        match session.tick().await {
            TickOutcome::Notice(n) => {
                assert_eq!(n.level, Level::Warning);
                assert_eq!(n.text, "No frame received");
            }
            _ => panic!("expected a notice"),
        }
        assert!(session.is_streaming());

        // Next tick is still attempted and succeeds.
        assert!(matches!(session.tick().await, TickOutcome::Frame(_)));
        assert_eq!(acquires.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fault_ends_the_stream_and_releases_the_handle() {
        let source =
            MockFrameSource::scripted(vec![AcquireOutcome::Fault("fiber unplugged".into())]);
        let closes = source.close_counter();
        let connector = MockCameraConnector::with_sources(vec![source]);

        let mut session = StreamSession::new();
        session.start(&connector);

        match session.tick().await {
            TickOutcome::Fault(n) => {
                assert_eq!(n.level, Level::Error);
                assert_eq!(n.text, "Error during streaming: fiber unplugged");
            }
            _ => panic!("expected a fault"),
        }
        assert!(!session.is_streaming());
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        // Stop after a fault is still a clean no-op.
        session.stop();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_is_observed_before_the_next_tick() {
        let connector = MockCameraConnector::with_test_pattern(8, 8);
        let mut session = StreamSession::new();
        session.start(&connector);

        assert!(matches!(session.tick().await, TickOutcome::Frame(_)));
        session.stop();
        assert!(matches!(session.tick().await, TickOutcome::Idle));
    }
}
