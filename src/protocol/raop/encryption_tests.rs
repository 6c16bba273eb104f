use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};

use super::encryption::*;

// AES-128 with an all-zero key applied to an all-zero block
const ZERO_BLOCK_CIPHERTEXT: [u8; 16] = [
    0x66, 0xe9, 0x4b, 0xd4, 0xef, 0x8a, 0x2c, 0x3b, 0x88, 0x4c, 0xfa, 0x59, 0xca, 0x34, 0x2b, 0x2e,
];

#[test]
fn test_two_block_zero_frame_known_ciphertext() {
    let encryptor = RaopEncryptor::default();
    let encrypted = encryptor.encrypt(&[0u8; 32]);

    assert_eq!(encrypted[..16], ZERO_BLOCK_CIPHERTEXT);

    // Second block is E(k, 0 ^ c0)
    let reference = Aes128::new(&GenericArray::from(DEFAULT_AES_KEY));
    let mut second = GenericArray::from(ZERO_BLOCK_CIPHERTEXT);
    reference.encrypt_block(&mut second);
    assert_eq!(encrypted[16..], second[..]);
}

#[test]
fn test_encryption_is_deterministic_per_frame() {
    let encryptor = RaopEncryptor::default();
    let frame = vec![0xAB; 64];

    // The chaining register restarts at the IV for every frame
    assert_eq!(encryptor.encrypt(&frame), encryptor.encrypt(&frame));
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let key = [0x42u8; AES_KEY_SIZE];
    let iv = [0x24u8; AES_IV_SIZE];

    let encryptor = RaopEncryptor::new(key, iv);
    let decryptor = RaopDecryptor::new(key, iv);

    let original: Vec<u8> = (0..=255u8).cycle().take(1415).collect();
    let encrypted = encryptor.encrypt(&original);
    assert_ne!(encrypted, original);
    assert_eq!(decryptor.decrypt(&encrypted), original);
}

#[test]
fn test_zero_frame_roundtrip_with_default_key() {
    let encrypted = RaopEncryptor::default().encrypt(&[0u8; 32]);
    assert_eq!(RaopDecryptor::default().decrypt(&encrypted), vec![0u8; 32]);
}

#[test]
fn test_partial_block_left_in_clear() {
    let encryptor = RaopEncryptor::default();
    let mut frame = vec![0u8; 17];
    frame[16] = 0x5A;

    let encrypted = encryptor.encrypt(&frame);
    assert_eq!(encrypted.len(), 17);
    assert_eq!(encrypted[..16], ZERO_BLOCK_CIPHERTEXT);
    assert_eq!(encrypted[16], 0x5A);
}

#[test]
fn test_short_frame_untouched() {
    let encryptor = RaopEncryptor::default();
    let frame = [1u8, 2, 3, 4, 5, 6, 7];
    assert_eq!(encryptor.encrypt(&frame), frame);
}

#[test]
fn test_encrypt_in_place_matches_encrypt() {
    let encryptor = RaopEncryptor::new([7u8; AES_KEY_SIZE], DEFAULT_AES_IV);
    let original = vec![0x11; 48];
    let mut data = original.clone();
    encryptor.encrypt_in_place(&mut data);
    assert_eq!(data, encryptor.encrypt(&original));
}
