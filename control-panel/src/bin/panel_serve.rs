//! Control panel HTTP server.
//!
//! Serves the embedded browser frontend and wires the dispatcher and
//! streaming session to mock drivers. `--without-motor` /
//! `--without-camera` start the panel with that driver absent, the
//! same state the panel enters when a driver module fails to load.

use anyhow::Result;
use clap::Parser;
use control_panel::dispatch::Dispatcher;
use control_panel::server::{run_server, AppState};
use hardware::camera::{MockCameraConnector, MockCameraControl};
use hardware::motor::MockMotor;
use hardware::{CameraConnector, CameraControl, MotorInterface};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Web control panel for the stage and camera")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Width of the mock camera frames
    #[arg(long, default_value = "640")]
    width: usize,

    /// Height of the mock camera frames
    #[arg(long, default_value = "480")]
    height: usize,

    /// Delay between stream refresh ticks in milliseconds
    #[arg(long, default_value = "50")]
    tick_interval_ms: u64,

    /// Start without a motor driver
    #[arg(long)]
    without_motor: bool,

    /// Start without a camera driver
    #[arg(long)]
    without_camera: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let motor: Option<Box<dyn MotorInterface>> = if args.without_motor {
        info!("starting without a motor driver");
        None
    } else {
        Some(Box::new(MockMotor::new()))
    };

    let (camera, connector): (Option<Box<dyn CameraControl>>, Arc<dyn CameraConnector>) =
        if args.without_camera {
            info!("starting without a camera driver");
            (None, Arc::new(MockCameraConnector::unavailable()))
        } else {
            info!("mock camera: {}x{}", args.width, args.height);
            (
                Some(Box::new(MockCameraControl::new())),
                Arc::new(MockCameraConnector::with_test_pattern(
                    args.width,
                    args.height,
                )),
            )
        };

    let state = Arc::new(AppState::new(
        Dispatcher::new(motor, camera),
        connector,
        Duration::from_millis(args.tick_interval_ms),
    ));

    run_server(state, args.port).await
}
