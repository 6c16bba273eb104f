//! Audio streaming: the pipeline-facing sink trait, the two audio
//! transports, the pacing clock and the timing responder

pub mod clock;
mod legacy;
mod rtp;
mod sink;
pub mod timing_responder;


use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;

pub use clock::{ClockSource, ManualClock, RtpClock, SystemClock};
pub use legacy::LegacyTransport;
pub use rtp::{RtpTransport, TimingSettings};
pub use sink::AudioSink;
pub use timing_responder::TimingResponder;

use crate::error::Result;
use crate::protocol::rtsp::{LowerTransport, ServerTransport};

/// Audio data channel, selected by the target scheme
///
/// Lifecycle: `prepare_setup` before SETUP, `configure` with the SETUP
/// response, `open` after RECORD, then `send` per frame.
#[async_trait]
pub trait Transport: Send + fmt::Debug {
    /// Which lower transport this is
    fn kind(&self) -> LowerTransport;

    /// Sample pairs per frame
    fn frames_per_packet(&self) -> usize;

    /// PCM bytes per frame
    fn frame_bytes(&self) -> usize {
        self.frames_per_packet() * 4
    }

    /// Transport header value for SETUP; binds local sockets if needed
    async fn prepare_setup(&mut self, local: IpAddr) -> Result<String>;

    /// Take the receiver ports from the SETUP response
    async fn configure(&mut self, remote: IpAddr, server: &ServerTransport) -> Result<()>;

    /// Open the audio data channel
    async fn open(&mut self) -> Result<()>;

    /// Send one framed (and possibly encrypted) buffer of `samples` sample pairs
    async fn send(&mut self, frame: &[u8], samples: u32) -> Result<()>;

    /// Close the audio data channel
    async fn close(&mut self);

    /// Release every socket and background task
    async fn shutdown(&mut self);

    /// Sequence/timestamp state
    fn clock(&self) -> &RtpClock;

    /// Mutable sequence/timestamp state
    fn clock_mut(&mut self) -> &mut RtpClock;
}
