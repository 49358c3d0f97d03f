//! HTTP surface of the panel.
//!
//! JSON endpoints wrap the dispatcher and the streaming session; the
//! live image feed goes out over a WebSocket. The server-side tick
//! loop is spawned on stream start and exits on its own once the
//! session leaves the Streaming state.

use crate::assets::serve_frontend;
use crate::dispatch::{Command, Dispatcher};
use crate::frame::acquire_single_frame;
use crate::notify::Notification;
use crate::session::{StreamSession, TickOutcome};
use crate::ws_stream::{ws_stream_handler, WsBroadcaster, WsFrame};
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use hardware::camera::CameraConnector;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub connector: Arc<dyn CameraConnector>,
    pub session: Mutex<StreamSession>,
    pub broadcaster: Arc<WsBroadcaster>,
    pub tick_interval: Duration,
    last_notice: Mutex<Option<Notification>>,
    loop_running: AtomicBool,
}

impl AppState {
    pub fn new(
        dispatcher: Dispatcher,
        connector: Arc<dyn CameraConnector>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            dispatcher,
            connector,
            session: Mutex::new(StreamSession::new()),
            broadcaster: Arc::new(WsBroadcaster::default()),
            tick_interval,
            last_notice: Mutex::new(None),
            loop_running: AtomicBool::new(false),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    pub value: f64,
}

#[derive(Serialize)]
pub struct SingleFrameResponse {
    pub notification: Notification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

#[derive(Serialize)]
pub struct StreamStatus {
    pub streaming: bool,
    pub notice: Option<Notification>,
}

async fn motor_move(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValueRequest>,
) -> Json<Notification> {
    Json(state.dispatcher.dispatch(Command::Move(req.value)))
}

async fn motor_speed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValueRequest>,
) -> Json<Notification> {
    Json(state.dispatcher.dispatch(Command::SetSpeed(req.value)))
}

async fn motor_position(State(state): State<Arc<AppState>>) -> Json<Notification> {
    Json(state.dispatcher.dispatch(Command::GetPosition))
}

async fn camera_exposure(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValueRequest>,
) -> Json<Notification> {
    Json(state.dispatcher.dispatch(Command::SetExposure(req.value)))
}

async fn camera_gain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValueRequest>,
) -> Json<Notification> {
    Json(state.dispatcher.dispatch(Command::SetGain(req.value)))
}

async fn single_frame(State(state): State<Arc<AppState>>) -> Json<SingleFrameResponse> {
    let shot = acquire_single_frame(state.connector.as_ref()).await;
    let image_base64 = shot
        .frame
        .map(|f| base64::engine::general_purpose::STANDARD.encode(&f.jpeg));
    Json(SingleFrameResponse {
        notification: shot.notification,
        image_base64,
    })
}

async fn stream_start(State(state): State<Arc<AppState>>) -> Json<Notification> {
    // The spawn decision happens under the session lock so it cannot
    // interleave with a tick loop observing its terminal tick.
    let mut session = state.session.lock().await;
    let notification = session.start(state.connector.as_ref());

    if session.is_streaming() {
        *state.last_notice.lock().await = None;
        spawn_tick_loop(Arc::clone(&state));
    }

    Json(notification)
}

async fn stream_stop(State(state): State<Arc<AppState>>) -> Json<Notification> {
    let mut session = state.session.lock().await;
    Json(session.stop())
}

async fn stream_status(State(state): State<Arc<AppState>>) -> Json<StreamStatus> {
    let streaming = state.session.lock().await.is_streaming();
    let notice = state.last_notice.lock().await.clone();
    Json(StreamStatus { streaming, notice })
}

async fn ws_frames(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    let broadcaster = Arc::clone(&state.broadcaster);
    ws.on_upgrade(move |socket| ws_stream_handler(socket, broadcaster))
}

/// Drive refresh ticks until the session goes Idle.
///
/// At most one loop runs at a time; a start request while a loop is
/// already running only swaps the session's handle underneath it.
/// Callers must hold the session lock: the loop hands the guard back
/// under that same lock on its terminal tick, so a start that sees
/// the session Streaming always has a loop driving it.
fn spawn_tick_loop(state: Arc<AppState>) {
    if state.loop_running.swap(true, Ordering::SeqCst) {
        return;
    }

    tokio::spawn(async move {
        let mut frame_number: u64 = 0;
        loop {
            let done = {
                let mut session = state.session.lock().await;
                let done = match session.tick().await {
                    TickOutcome::Idle => true,
                    TickOutcome::Frame(encoded) => {
                        frame_number += 1;
                        state
                            .broadcaster
                            .publish(WsFrame::new(encoded, frame_number));
                        false
                    }
                    TickOutcome::Notice(notice) => {
                        *state.last_notice.lock().await = Some(notice);
                        false
                    }
                    TickOutcome::Fault(notice) => {
                        *state.last_notice.lock().await = Some(notice);
                        true
                    }
                };
                if done {
                    state.loop_running.store(false, Ordering::SeqCst);
                }
                done
            };

            if done {
                break;
            }
            tokio::time::sleep(state.tick_interval).await;
        }

        info!("tick loop exited after {frame_number} frames");
    });
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/motor/move", post(motor_move))
        .route("/api/motor/speed", post(motor_speed))
        .route("/api/motor/position", get(motor_position))
        .route("/api/camera/exposure", post(camera_exposure))
        .route("/api/camera/gain", post(camera_gain))
        .route("/api/frame", get(single_frame))
        .route("/api/stream/start", post(stream_start))
        .route("/api/stream/stop", post(stream_stop))
        .route("/api/stream/status", get(stream_status))
        .route("/ws/frames", get(ws_frames))
        .fallback(serve_frontend)
        .with_state(state)
}

/// Bind and serve until shutdown.
pub async fn run_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("control panel listening on http://{addr}");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
