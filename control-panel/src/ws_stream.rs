//! WebSocket fan-out for the live frame stream.
//!
//! Every connected browser receives each published frame as a single
//! binary message: a 16-byte header (width and height as `u32`
//! little-endian, then the frame number as `u64` little-endian)
//! followed by the JPEG bytes. Clients that fall behind skip frames
//! instead of stalling the stream.

use crate::frame::EncodedFrame;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// A frame ready for WebSocket delivery.
#[derive(Clone)]
pub struct WsFrame {
    pub jpeg_data: Bytes,
    pub frame_number: u64,
    pub width: u32,
    pub height: u32,
}

impl WsFrame {
    pub fn new(encoded: EncodedFrame, frame_number: u64) -> Self {
        Self {
            jpeg_data: Bytes::from(encoded.jpeg),
            frame_number,
            width: encoded.width,
            height: encoded.height,
        }
    }

    /// Header fields followed by the JPEG payload.
    pub fn to_binary(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16 + self.jpeg_data.len());
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf.extend_from_slice(&self.frame_number.to_le_bytes());
        buf.extend_from_slice(&self.jpeg_data);
        buf
    }
}

/// Broadcasts stream frames to every connected WebSocket client.
///
/// Slow clients lag and skip frames rather than stall the stream.
pub struct WsBroadcaster {
    tx: broadcast::Sender<WsFrame>,
}

impl WsBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a frame; returns the number of subscribers reached.
    pub fn publish(&self, frame: WsFrame) -> usize {
        self.tx.send(frame).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsFrame> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Forward broadcast frames to one WebSocket client until it leaves.
pub async fn ws_stream_handler(ws: WebSocket, broadcaster: Arc<WsBroadcaster>) {
    let (mut to_client, mut from_client) = ws.split();
    let mut frames = broadcaster.subscribe();

    // The client sends nothing we act on; watch its side only to
    // notice the disconnect.
    let mut client_gone = tokio::spawn(async move {
        while let Some(msg) = from_client.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    loop {
        tokio::select! {
            received = frames.recv() => match received {
                Ok(frame) => {
                    if to_client.send(Message::Binary(frame.to_binary())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("dropping {n} frames for a slow client");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut client_gone => break,
        }
    }

    client_gone.abort();
    debug!("frame stream client disconnected");
}
