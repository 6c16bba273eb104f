use bytes::{BufMut, BytesMut};
use thiserror::Error;

/// RTP packet decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RtpDecodeError {
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    #[error("unexpected header byte {index}: {value:#04x}")]
    UnexpectedByte { index: usize, value: u8 },
}

/// RAOP RTP payload types (low 7 bits of byte 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RaopPayloadType {
    /// Timing request (receiver -> sender)
    TimingRequest = 0x52,
    /// Timing response (sender -> receiver)
    TimingResponse = 0x53,
    /// Sync packet (sender -> receiver on control channel)
    Sync = 0x54,
    /// Ends the local timing responder
    Terminate = 0x5E,
    /// Audio data
    Audio = 0x60,
}

impl RaopPayloadType {
    /// Parse from byte value, ignoring the marker bit
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b & 0x7F {
            0x52 => Some(Self::TimingRequest),
            0x53 => Some(Self::TimingResponse),
            0x54 => Some(Self::Sync),
            0x5E => Some(Self::Terminate),
            0x60 => Some(Self::Audio),
            _ => None,
        }
    }
}

fn check_len(buf: &[u8], needed: usize) -> Result<(), RtpDecodeError> {
    if buf.len() < needed {
        return Err(RtpDecodeError::BufferTooSmall {
            needed,
            have: buf.len(),
        });
    }
    Ok(())
}

/// 12-byte header of an RTP audio packet
///
/// ```text
/// 80 (60|M) SEQ SEQ TS TS TS TS 00 00 00 00
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpAudioHeader {
    /// Marker bit, set on the first packet after RECORD/FLUSH
    pub marker: bool,
    /// Sequence number
    pub sequence: u16,
    /// Timestamp in samples
    pub timestamp: u32,
}

impl RtpAudioHeader {
    /// Header size in bytes
    pub const SIZE: usize = 12;

    /// Append the encoded header to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(0x80);
        let marker = if self.marker { 0x80 } else { 0x00 };
        buf.put_u8(RaopPayloadType::Audio as u8 | marker);
        buf.put_u16(self.sequence);
        buf.put_u32(self.timestamp);
        buf.put_u32(0);
    }

    /// Encode to a fresh buffer
    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode_into(&mut buf);
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode from the start of a packet
    ///
    /// # Errors
    /// Returns `RtpDecodeError` if the buffer is short or not an audio packet.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpDecodeError> {
        check_len(buf, Self::SIZE)?;
        if RaopPayloadType::from_byte(buf[1]) != Some(RaopPayloadType::Audio) {
            return Err(RtpDecodeError::UnexpectedByte {
                index: 1,
                value: buf[1],
            });
        }
        Ok(Self {
            marker: buf[1] & 0x80 != 0,
            sequence: u16::from_be_bytes([buf[2], buf[3]]),
            timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }
}

/// 16-byte header in front of every frame on the legacy TCP audio channel
///
/// ```text
/// 24 00 LL LL F0 FF 00 00 00 00 00 00 00 00 00 00
/// ```
/// `LLLL` is the big-endian frame length plus 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyFrameHeader {
    /// Length of the frame that follows
    pub frame_len: u16,
}

impl LegacyFrameHeader {
    /// Header size in bytes
    pub const SIZE: usize = 16;

    const MARKER: [u8; 2] = [0x24, 0x00];
    const FIXED: [u8; 12] = [0xF0, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    const LENGTH_BIAS: u16 = 12;

    /// Append the encoded header to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(&Self::MARKER);
        buf.put_u16(self.frame_len.wrapping_add(Self::LENGTH_BIAS));
        buf.put_slice(&Self::FIXED);
    }

    /// Decode a header, returning the frame length that follows
    ///
    /// # Errors
    /// Returns `RtpDecodeError` if the buffer is short or the marker is wrong.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpDecodeError> {
        check_len(buf, Self::SIZE)?;
        if buf[0] != Self::MARKER[0] {
            return Err(RtpDecodeError::UnexpectedByte {
                index: 0,
                value: buf[0],
            });
        }
        let len = u16::from_be_bytes([buf[2], buf[3]]);
        Ok(Self {
            frame_len: len.wrapping_sub(Self::LENGTH_BIAS),
        })
    }
}
