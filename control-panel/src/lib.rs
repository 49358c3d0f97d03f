//! Web control panel for a motorized stage and a camera.
//!
//! The panel is a thin adapter: numeric values from browser widgets
//! become single driver calls, and driver results or faults become
//! on-screen notifications. A small refresh loop pulls one camera
//! frame per tick, encodes it as JPEG, and pushes it to connected
//! WebSocket clients.

pub mod assets;
pub mod dispatch;
pub mod frame;
pub mod notify;
pub mod server;
pub mod session;
pub mod ws_stream;
