//! The legacy VNC Authentication challenge transform.
//!
//! The server sends a 16-byte random challenge and expects it back encrypted with DES under a
//! key derived from the password. The original protocol definition feeds the password bytes into
//! the DES key schedule with the bits of every byte reversed, so a plain DES implementation has
//! to mirror each key byte first.

use cipher::{BlockEncrypt, KeyInit};
use des::Des;

/// Encrypts the 16-byte authentication challenge with the session password.
///
/// The password is truncated to 8 bytes and zero-padded; the challenge is encrypted as two
/// independent 8-byte ECB blocks.
pub fn encrypt_challenge(challenge: &[u8; 16], password: &str) -> [u8; 16] {
    let mut key = [0u8; 8];
    for (key_byte, password_byte) in key.iter_mut().zip(password.bytes()) {
        *key_byte = password_byte.reverse_bits();
    }

    // The key is always exactly 8 bytes, so this cannot fail.
    let cipher = Des::new_from_slice(&key).expect("DES key must be 8 bytes");

    let mut response = *challenge;
    for block in response.chunks_exact_mut(8) {
        let block: &mut [u8; 8] = block.try_into().expect("chunks are 8 bytes");
        cipher.encrypt_block(block.into());
    }
    response
}
