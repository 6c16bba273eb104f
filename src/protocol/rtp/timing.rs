use std::time::{SystemTime, UNIX_EPOCH};

use super::packet::{RaopPayloadType, RtpDecodeError};

/// Seconds between 1900-01-01 and 1970-01-01
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// 64-bit NTP time: whole seconds since 1900 and a 2^-32 fraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NtpTimestamp {
    pub seconds: u32,
    pub fraction: u32,
}

impl NtpTimestamp {
    #[must_use]
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Seconds wrap modulo 2^32 as NTP era 0 does
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_system_time(time: SystemTime) -> Self {
        let since_unix = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            seconds: (since_unix.as_secs() + NTP_UNIX_OFFSET) as u32,
            fraction: ((u64::from(since_unix.subsec_nanos()) << 32) / 1_000_000_000) as u32,
        }
    }

    /// Big-endian seconds then fraction
    #[must_use]
    pub fn encode(&self) -> [u8; 8] {
        ((u64::from(self.seconds) << 32) | u64::from(self.fraction)).to_be_bytes()
    }

    /// Missing trailing bytes read as zero
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(buf: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        let len = buf.len().min(raw.len());
        raw[..len].copy_from_slice(&buf[..len]);
        let value = u64::from_be_bytes(raw);
        Self {
            seconds: (value >> 32) as u32,
            fraction: value as u32,
        }
    }
}

/// Timing channel datagram
///
/// ```text
/// 0      1      2..4   4..8   8..16      16..24    24..32
/// 0x80   T|0x80 0x0007 zero   reference  receive   send
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPacket {
    pub payload_type: RaopPayloadType,
    pub reference_time: NtpTimestamp,
    pub receive_time: NtpTimestamp,
    pub send_time: NtpTimestamp,
}

impl TimingPacket {
    pub const SIZE: usize = 32;

    fn with_type(payload_type: RaopPayloadType) -> Self {
        Self {
            payload_type,
            reference_time: NtpTimestamp::default(),
            receive_time: NtpTimestamp::default(),
            send_time: NtpTimestamp::default(),
        }
    }

    /// What a receiver sends to probe our clock
    #[must_use]
    pub fn request(now: NtpTimestamp) -> Self {
        Self {
            send_time: now,
            ..Self::with_type(RaopPayloadType::TimingRequest)
        }
    }

    /// Local datagram that makes the timing responder exit
    #[must_use]
    pub fn terminate() -> Self {
        Self::with_type(RaopPayloadType::Terminate)
    }

    /// Answer: the request's send time comes back as the reference time,
    /// receive and send are both `now`
    #[must_use]
    pub fn response(&self, now: NtpTimestamp) -> Self {
        Self {
            payload_type: RaopPayloadType::TimingResponse,
            reference_time: self.send_time,
            receive_time: now,
            send_time: now,
        }
    }

    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..4].copy_from_slice(&[0x80, self.payload_type as u8 | 0x80, 0x00, 0x07]);
        out[8..16].copy_from_slice(&self.reference_time.encode());
        out[16..24].copy_from_slice(&self.receive_time.encode());
        out[24..32].copy_from_slice(&self.send_time.encode());
        out
    }

    /// # Errors
    /// `BufferTooSmall` under 32 bytes, `UnexpectedByte` for an unknown type.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpDecodeError> {
        let Some(raw) = buf.get(..Self::SIZE) else {
            return Err(RtpDecodeError::BufferTooSmall {
                needed: Self::SIZE,
                have: buf.len(),
            });
        };
        let payload_type = RaopPayloadType::from_byte(raw[1]).ok_or(RtpDecodeError::UnexpectedByte {
            index: 1,
            value: raw[1],
        })?;

        Ok(Self {
            payload_type,
            reference_time: NtpTimestamp::decode(&raw[8..16]),
            receive_time: NtpTimestamp::decode(&raw[16..24]),
            send_time: NtpTimestamp::decode(&raw[24..32]),
        })
    }
}
