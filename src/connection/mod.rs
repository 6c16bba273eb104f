//! RTSP control connection and session lifecycle state

mod control;
mod state;

pub use control::ControlChannel;
pub use state::{ConnectionStats, SessionFlags, SessionState};
