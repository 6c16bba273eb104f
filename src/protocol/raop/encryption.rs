//! RAOP audio encryption using AES-128-CBC
//!
//! Every frame is encrypted independently: the chaining register starts at
//! the IV, only whole 16-byte blocks are encrypted and a trailing partial
//! block is sent in the clear.

use aes::Aes128;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray};

/// AES key size (128 bits)
pub const AES_KEY_SIZE: usize = 16;
/// AES IV size (128 bits)
pub const AES_IV_SIZE: usize = 16;
/// AES block size
pub const AES_BLOCK_SIZE: usize = 16;

/// Well-known default session key
pub const DEFAULT_AES_KEY: [u8; AES_KEY_SIZE] = [0; AES_KEY_SIZE];
/// Well-known default IV
pub const DEFAULT_AES_IV: [u8; AES_IV_SIZE] = [0; AES_IV_SIZE];

/// RAOP audio encryptor
pub struct RaopEncryptor {
    cipher: Aes128,
    iv: [u8; AES_IV_SIZE],
}

impl RaopEncryptor {
    /// Create a new encryptor with given key and IV
    #[must_use]
    pub fn new(key: [u8; AES_KEY_SIZE], iv: [u8; AES_IV_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(&GenericArray::from(key)),
            iv,
        }
    }

    /// Encrypt one frame in place
    pub fn encrypt_in_place(&self, frame: &mut [u8]) {
        let mut register = self.iv;
        for chunk in frame.chunks_exact_mut(AES_BLOCK_SIZE) {
            for (byte, prev) in chunk.iter_mut().zip(register.iter()) {
                *byte ^= prev;
            }
            let block = GenericArray::from_mut_slice(chunk);
            self.cipher.encrypt_block(block);
            register.copy_from_slice(chunk);
        }
    }

    /// Encrypt one frame into a new buffer
    #[must_use]
    pub fn encrypt(&self, frame: &[u8]) -> Vec<u8> {
        let mut output = frame.to_vec();
        self.encrypt_in_place(&mut output);
        output
    }

    /// IV sent with the session description
    #[must_use]
    pub fn iv(&self) -> &[u8; AES_IV_SIZE] {
        &self.iv
    }
}

impl Default for RaopEncryptor {
    fn default() -> Self {
        Self::new(DEFAULT_AES_KEY, DEFAULT_AES_IV)
    }
}

impl std::fmt::Debug for RaopEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaopEncryptor").finish_non_exhaustive()
    }
}

/// RAOP audio decryptor (for receiver/testing)
pub struct RaopDecryptor {
    cipher: Aes128,
    iv: [u8; AES_IV_SIZE],
}

impl RaopDecryptor {
    /// Create a new decryptor with given key and IV
    #[must_use]
    pub fn new(key: [u8; AES_KEY_SIZE], iv: [u8; AES_IV_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(&GenericArray::from(key)),
            iv,
        }
    }

    /// Decrypt one frame in place
    pub fn decrypt_in_place(&self, frame: &mut [u8]) {
        let mut register = self.iv;
        for chunk in frame.chunks_exact_mut(AES_BLOCK_SIZE) {
            let mut next = [0u8; AES_BLOCK_SIZE];
            next.copy_from_slice(chunk);
            self.cipher
                .decrypt_block(GenericArray::from_mut_slice(chunk));
            for (byte, prev) in chunk.iter_mut().zip(register.iter()) {
                *byte ^= prev;
            }
            register = next;
        }
    }

    /// Decrypt one frame into a new buffer
    #[must_use]
    pub fn decrypt(&self, frame: &[u8]) -> Vec<u8> {
        let mut output = frame.to_vec();
        self.decrypt_in_place(&mut output);
        output
    }
}

impl Default for RaopDecryptor {
    fn default() -> Self {
        Self::new(DEFAULT_AES_KEY, DEFAULT_AES_IV)
    }
}
