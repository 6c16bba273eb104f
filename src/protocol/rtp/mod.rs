//! RAOP audio wire packets: RTP audio header, legacy TCP frame header,
//! sync and timing packets

mod packet;
mod sync;
mod timing;


pub use packet::{LegacyFrameHeader, RaopPayloadType, RtpAudioHeader, RtpDecodeError};
pub use sync::SyncPacket;
pub use timing::{NtpTimestamp, TimingPacket};

/// RAOP streaming constants
pub mod constants {
    /// Audio sample rate
    pub const SAMPLE_RATE: u32 = 44100;

    /// RTP timestamp origin after RECORD and FLUSH (two seconds of samples)
    pub const TIMESTAMP_ORIGIN: u32 = 88200;

    /// A sync packet precedes every packet whose sequence is a multiple of this
    pub const SYNC_INTERVAL: u16 = 126;

    /// Samples subtracted from the live timestamp in sync packets
    pub const SYNC_LATENCY: u32 = 11025;

    /// Audio frames per RTP packet (352 samples at 44.1kHz ≈ 8ms)
    pub const RTP_FRAMES_PER_PACKET: usize = 352;

    /// Audio frames per legacy TCP frame
    pub const LEGACY_FRAMES_PER_PACKET: usize = 4096;
}
