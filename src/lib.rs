//! # raop-output
//!
//! Streams 16-bit 44.1kHz stereo PCM to `AirPlay` 1 (RAOP) receivers.
//!
//! ## Features
//!
//! - RTSP session control with Digest authentication
//! - Legacy TCP and RTP/UDP audio transports
//! - Uncompressed Apple Lossless framing with optional AES encryption
//! - Sync and timing packets for the UDP transport
//! - Volume, pause, flush and drain
//!
//! ## Example
//!
//! ```rust,no_run
//! use raop_output::{AudioFormat, AudioSink, RaopClient, RaopConfig};
//!
//! # async fn example() -> Result<(), raop_output::RaopError> {
//! let mut client = RaopClient::new("raop://192.168.1.20:5000", RaopConfig::default())?;
//!
//! let pcm = vec![0u8; 16384];
//! client.put_audio(AudioFormat::CD_QUALITY, &pcm).await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Sink**: `RaopClient` implements `AudioSink` and drives the session lazily
//! - **Session**: `connection` owns the RTSP control channel
//! - **Transport**: `streaming` carries audio frames over TCP or RTP/UDP
//! - **Protocol**: sans-IO codecs for RTSP, SDP, RTP and encryption

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

pub mod audio;
mod client;
pub mod connection;
pub mod control;
pub mod net;
pub mod protocol;
/// Streaming support
pub mod streaming;

// Re-exports
pub use audio::{AudioFormat, SampleFormat};
pub use client::RaopClient;
pub use connection::SessionState;
pub use control::volume::Volume;
pub use error::{RaopError, Result};
pub use streaming::{AudioSink, Transport};
pub use types::{RaopConfig, RaopConfigBuilder, RaopTarget};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
