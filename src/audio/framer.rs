//! Uncompressed Apple Lossless envelope
//!
//! ```text
//! chan:3 (1 = stereo) | 0:16 | has_size:1 | 0:2 | uncompressed:1 | N:32 | N × (L:16 R:16)
//! ```
//! Bits are packed MSB-first and the final partial byte is zero padded,
//! so a frame of `N` sample pairs is `7 + 4N` bytes.

const HEADER_BITS: u32 = 3 + 16 + 1 + 2 + 1 + 32;

/// Framed length for `pairs` stereo sample pairs
#[must_use]
pub const fn frame_len(pairs: usize) -> usize {
    (HEADER_BITS as usize + 32 * pairs).div_ceil(8)
}

struct BitWriter<'a> {
    out: &'a mut Vec<u8>,
    acc: u64,
    bits: u32,
}

impl<'a> BitWriter<'a> {
    fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out, acc: 0, bits: 0 }
    }

    /// Append the low `width` bits of `value` (`width` <= 32)
    #[allow(clippy::cast_possible_truncation)]
    fn write(&mut self, value: u32, width: u32) {
        let mask = (1u64 << width) - 1;
        self.acc = (self.acc << width) | (u64::from(value) & mask);
        self.bits += width;
        while self.bits >= 8 {
            self.bits -= 8;
            self.out.push((self.acc >> self.bits) as u8);
        }
        self.acc &= (1u64 << self.bits) - 1;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn finish(self) {
        if self.bits > 0 {
            self.out.push((self.acc << (8 - self.bits)) as u8);
        }
    }
}

/// Wrap interleaved native-endian 16-bit stereo PCM into one frame
///
/// Any trailing bytes short of a whole sample pair are ignored.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_frame(pcm: &[u8], out: &mut Vec<u8>) {
    let pairs = pcm.len() / 4;
    out.reserve(frame_len(pairs));

    let mut writer = BitWriter::new(out);
    writer.write(1, 3); // stereo
    writer.write(0, 16);
    writer.write(1, 1); // has size
    writer.write(0, 2);
    writer.write(1, 1); // uncompressed
    writer.write(pairs as u32, 32);

    for sample in pcm[..pairs * 4].chunks_exact(2) {
        let value = i16::from_ne_bytes([sample[0], sample[1]]);
        writer.write(u32::from(value as u16), 16);
    }
    writer.finish();
}
