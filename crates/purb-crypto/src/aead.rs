//! Entrypoint encryption using `ChaCha20-Poly1305`
//!
//! All functions are pure. The nonce is the blob nonce shared by every
//! entrypoint; uniqueness comes from the per-recipient key.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};

use crate::error::CryptoError;

/// Size of the AEAD nonce, which is also the blob nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Size of the AEAD key (32 bytes)
pub const AEAD_KEY_SIZE: usize = 32;

/// Poly1305 tag size (16 bytes)
pub const AEAD_TAG_SIZE: usize = 16;

/// Encrypt `plaintext` with `ChaCha20-Poly1305`.
///
/// Output is `plaintext.len() + AEAD_TAG_SIZE` bytes.
pub fn seal(key: &[u8; AEAD_KEY_SIZE], nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(key.into());

    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(nonce), plaintext) else {
        unreachable!("ChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    ciphertext
}

/// Decrypt and authenticate `ciphertext`.
///
/// # Errors
///
/// - `DecryptionFailed`: If authentication tag or key is incorrect. During
///   trial decryption this simply means "not this bucket".
pub fn open(
    key: &[u8; AEAD_KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < AEAD_TAG_SIZE {
        return Err(CryptoError::DecryptionFailed {
            reason: format!("ciphertext shorter than tag: {} bytes", ciphertext.len()),
        });
    }

    let cipher = ChaCha20Poly1305::new(key.into());

    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| {
        CryptoError::DecryptionFailed { reason: "authentication failed".to_string() }
    })
}
