//! ANNOUNCE session descriptions
//!
//! A RAOP sender only ever describes one stream: a single `audio` media
//! section carrying payload type 96 (Apple Lossless), its `fmtp` parameters
//! and, when encrypting, the wrapped key and IV.

mod builder;
mod parser;


pub use builder::{AnnounceParams, create_raop_announce_sdp};
pub use parser::{AnnounceSdp, SdpParseError};

/// Payload type announced for the audio stream
pub const PAYLOAD_TYPE: u8 = 96;

/// `fmtp` parameters after the frames-per-packet field: compatible version,
/// bit depth, rice history/initial/limit, channels, max run, max frame
/// bytes, average bitrate, sample rate
pub const FMTP_TAIL: &str = "0 16 40 10 14 2 255 0 0 44100";
