//! Payload encryption using the `ChaCha20` stream cipher
//!
//! The payload carries no authentication of its own; the blob-wide HMAC tag
//! covers it. Encryption and decryption are the same operation.

use chacha20::{
    ChaCha20,
    cipher::{KeyIvInit, StreamCipher},
};

use crate::aead::NONCE_SIZE;

/// Size of the stream cipher key (32 bytes)
pub const STREAM_KEY_SIZE: usize = 32;

/// XOR `data` in place with the `ChaCha20` keystream for `key` and `nonce`.
///
/// Applying it twice with the same inputs restores the original bytes.
pub fn apply_keystream(key: &[u8; STREAM_KEY_SIZE], nonce: &[u8; NONCE_SIZE], data: &mut [u8]) {
    let mut cipher = ChaCha20::new(key.into(), nonce.into());
    cipher.apply_keystream(data);
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn keystream_is_an_involution() {
        let key = [3u8; STREAM_KEY_SIZE];
        let nonce = [5u8; NONCE_SIZE];
        let original = b"padded payload bytes".to_vec();

        let mut data = original.clone();
        apply_keystream(&key, &nonce, &mut data);
        assert_ne!(data, original);

        apply_keystream(&key, &nonce, &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn different_nonce_changes_ciphertext() {
        let key = [3u8; STREAM_KEY_SIZE];

        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];
        apply_keystream(&key, &[0u8; NONCE_SIZE], &mut a);
        apply_keystream(&key, &[1u8; NONCE_SIZE], &mut b);

        assert_ne!(a, b);
    }

    #[test]
    fn empty_input_is_noop() {
        let mut data: Vec<u8> = Vec::new();
        apply_keystream(&[0u8; STREAM_KEY_SIZE], &[0u8; NONCE_SIZE], &mut data);
        assert!(data.is_empty());
    }

    proptest! {
        #[test]
        fn prop_keystream_is_an_involution(
            key in any::<[u8; STREAM_KEY_SIZE]>(),
            nonce in any::<[u8; NONCE_SIZE]>(),
            original in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            let mut data = original.clone();
            apply_keystream(&key, &nonce, &mut data);
            apply_keystream(&key, &nonce, &mut data);

            prop_assert_eq!(data, original);
        }

        #[test]
        fn prop_keystream_prefix_is_stable(
            key in any::<[u8; STREAM_KEY_SIZE]>(),
            short in 0usize..64,
            extra in 0usize..64,
        ) {
            let nonce = [7u8; NONCE_SIZE];
            let mut a = vec![0u8; short];
            let mut b = vec![0u8; short + extra];
            apply_keystream(&key, &nonce, &mut a);
            apply_keystream(&key, &nonce, &mut b);

            prop_assert_eq!(&a[..], &b[..short]);
        }
    }
}
