//! Pipeline-facing audio sink

use async_trait::async_trait;

use crate::audio::AudioFormat;
use crate::error::Result;

/// Consumer end of an audio pipeline
///
/// Calls arrive from one driver in order; each may wait on network I/O up
/// to the configured timeouts.
#[async_trait]
pub trait AudioSink: Send {
    /// Queue interleaved PCM for playback
    ///
    /// # Errors
    /// `UnsupportedFormat` for anything but 44.1 kHz stereo 16-bit, or the
    /// error of an implicit connect.
    async fn put_audio(&mut self, format: AudioFormat, data: &[u8]) -> Result<()>;

    /// Connect and start recording
    async fn start(&mut self) -> Result<()>;

    /// Tear the session down; a no-op when nothing is running
    async fn stop(&mut self) -> Result<()>;

    /// Stop sending and drop buffered audio
    async fn pause(&mut self) -> Result<()>;

    /// Accept audio again after `pause`
    async fn resume(&mut self) -> Result<()>;

    /// Flush receiver and local buffers
    async fn seek(&mut self) -> Result<()>;

    /// Pad the partial buffer with silence and send it
    async fn drain(&mut self) -> Result<()>;

    /// Set linear volume in `0.0..=1.0`
    async fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Last requested linear volume
    fn volume(&self) -> f32;

    /// Release every connection and background task
    async fn close(&mut self) -> Result<()>;
}
