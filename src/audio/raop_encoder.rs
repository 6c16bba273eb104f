//! RAOP audio encoding with encryption

use super::framer::{encode_frame, frame_len};
use crate::protocol::raop::encryption::RaopEncryptor;

/// Frames PCM and, when a session key is in use, encrypts the frame
#[derive(Debug, Default)]
pub struct RaopAudioEncoder {
    encryptor: Option<RaopEncryptor>,
}

impl RaopAudioEncoder {
    /// Create a new encoder
    #[must_use]
    pub fn new(encryptor: Option<RaopEncryptor>) -> Self {
        Self { encryptor }
    }

    /// Check if frames are encrypted
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.encryptor.is_some()
    }

    /// Enable or replace encryption
    pub fn set_encryptor(&mut self, encryptor: Option<RaopEncryptor>) {
        self.encryptor = encryptor;
    }

    /// Encode interleaved 16-bit stereo PCM into a wire-ready frame
    #[must_use]
    pub fn encode(&self, pcm: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(frame_len(pcm.len() / 4));
        encode_frame(pcm, &mut frame);
        if let Some(encryptor) = &self.encryptor {
            encryptor.encrypt_in_place(&mut frame);
        }
        frame
    }
}
