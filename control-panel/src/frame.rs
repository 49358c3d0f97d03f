//! Frame conversion and the one-shot acquisition path.
//!
//! Raw sensor frames are 16-bit; the browser gets an 8-bit JPEG. The
//! one-shot path opens its own transient connection, separate from the
//! streaming session, and reports its own set of notifications.

use crate::notify::Notification;
use anyhow::Context;
use hardware::camera::{CameraConnector, Frame, FrameSource};
use image::{ImageBuffer, Luma};

/// A frame ready for the browser.
pub struct EncodedFrame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Scale raw 16-bit pixels so the brightest pixel maps to 255.
pub fn scale_to_u8(frame: &Frame) -> Vec<u8> {
    let max_val = *frame.iter().max().unwrap_or(&1) as f32;
    let scale = if max_val > 0.0 { 255.0 / max_val } else { 1.0 };

    frame
        .iter()
        .map(|&val| ((val as f32) * scale) as u8)
        .collect()
}

/// Encode a raw frame as a grayscale JPEG.
pub fn encode_jpeg(frame: &Frame) -> anyhow::Result<EncodedFrame> {
    let (height, width) = frame.dim();
    let pixels = scale_to_u8(frame);

    let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(width as u32, height as u32, pixels)
        .context("frame dimensions do not match pixel count")?;

    let mut jpeg = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .context("JPEG encoding failed")?;

    Ok(EncodedFrame {
        jpeg,
        width: width as u32,
        height: height as u32,
    })
}

/// Outcome of the one-shot acquisition.
pub struct SingleShot {
    pub notification: Notification,
    pub frame: Option<EncodedFrame>,
}

impl SingleShot {
    fn without_frame(notification: Notification) -> Self {
        Self {
            notification,
            frame: None,
        }
    }
}

/// Acquire and encode one frame over a transient connection.
///
/// The driver call runs on a blocking worker so the caller's task is
/// only suspended, never blocked. The connection is released before
/// returning.
pub async fn acquire_single_frame(connector: &dyn CameraConnector) -> SingleShot {
    let Some(handle) = connector.connect() else {
        return SingleShot::without_frame(Notification::error("Camera connection not available."));
    };

    let mut handle = handle;
    let (mut handle, result) = match tokio::task::spawn_blocking(move || {
        let result = handle.acquire_frame();
        (handle, result)
    })
    .await
    {
        Ok(pair) => pair,
        Err(e) => {
            return SingleShot::without_frame(Notification::error(format!(
                "Error acquiring or displaying frame: {e}"
            )))
        }
    };

    let shot = match result {
        Ok(Some(frame)) => match encode_jpeg(&frame) {
            Ok(encoded) => SingleShot {
                notification: Notification::success("Single frame acquired and displayed."),
                frame: Some(encoded),
            },
            Err(e) => {
                tracing::debug!("one-shot encode failed: {e}");
                SingleShot::without_frame(Notification::error("Could not encode frame to JPEG."))
            }
        },
        Ok(None) => SingleShot::without_frame(Notification::warning("No frames received.")),
        Err(e) => SingleShot::without_frame(Notification::error(format!(
            "Error acquiring or displaying frame: {e}"
        ))),
    };

    handle.close();
    shot
}
