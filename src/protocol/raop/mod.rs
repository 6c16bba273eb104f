//! RAOP (`AirPlay` 1) protocol pieces: Digest authentication and audio encryption

pub mod auth;
pub mod encryption;

#[cfg(test)]
mod encryption_tests;

pub use auth::{AuthContext, DIGEST_USERNAME, digest_response};
pub use encryption::{
    AES_IV_SIZE, AES_KEY_SIZE, DEFAULT_AES_IV, DEFAULT_AES_KEY, RaopDecryptor, RaopEncryptor,
};
