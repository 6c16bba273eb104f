use bytes::{BufMut, BytesMut};

use super::constants::SYNC_LATENCY;
use super::packet::{RaopPayloadType, RtpDecodeError};
use super::timing::NtpTimestamp;

/// RAOP sync packet, sent on the control channel
///
/// Ties the RTP timestamp about to be sent to wall-clock NTP time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPacket {
    /// First sync packet of the stream (sets 0x10 in byte 0)
    pub first: bool,
    /// Live timestamp minus the fixed latency
    pub latency_timestamp: u32,
    /// Current NTP time
    pub ntp_time: NtpTimestamp,
    /// Timestamp of the packet that follows
    pub timestamp: u32,
}

impl SyncPacket {
    /// Sync packet size
    pub const SIZE: usize = 20;

    /// Build the sync packet for the live timestamp
    #[must_use]
    pub fn new(timestamp: u32, ntp_time: NtpTimestamp, first: bool) -> Self {
        Self {
            first,
            latency_timestamp: timestamp.wrapping_sub(SYNC_LATENCY),
            ntp_time,
            timestamp,
        }
    }

    /// Encode to bytes
    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u8(if self.first { 0x90 } else { 0x80 });
        buf.put_u8(RaopPayloadType::Sync as u8 | 0x80);
        // Fixed, carries no sequence information
        buf.put_u16(0x0007);
        buf.put_u32(self.latency_timestamp);
        buf.put_slice(&self.ntp_time.encode());
        buf.put_u32(self.timestamp);

        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode from bytes
    ///
    /// # Errors
    /// Returns `RtpDecodeError` if the buffer is short or not a sync packet.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpDecodeError> {
        if buf.len() < Self::SIZE {
            return Err(RtpDecodeError::BufferTooSmall {
                needed: Self::SIZE,
                have: buf.len(),
            });
        }
        if RaopPayloadType::from_byte(buf[1]) != Some(RaopPayloadType::Sync) {
            return Err(RtpDecodeError::UnexpectedByte {
                index: 1,
                value: buf[1],
            });
        }

        Ok(Self {
            first: buf[0] & 0x10 != 0,
            latency_timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ntp_time: NtpTimestamp::decode(&buf[8..16]),
            timestamp: u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]),
        })
    }
}
