//! Key-agreement suites
//!
//! A [`Suite`] bundles everything the header layout needs from a curve:
//! keypair generation, the hiding encoding that makes a public key look like
//! uniform bytes, and Diffie-Hellman. Suites are dispatched dynamically
//! through `Arc<dyn Suite>` so one blob can mix curves.

use std::fmt;

use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// A suite's keypair in marshaled form.
///
/// The private half is zeroized on drop and never printed.
#[derive(Clone)]
pub struct KeyPair {
    /// Marshaled public key
    pub public: Vec<u8>,
    /// Marshaled private key
    pub private: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_len", &self.public.len())
            .field("private", &"<redacted>")
            .finish()
    }
}

/// Capabilities of one cryptographic suite.
pub trait Suite: fmt::Debug + Send + Sync {
    /// Human-readable suite name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Length of a hidden-encoded public key.
    ///
    /// Must match the configured cornerstone length for this suite.
    fn hidden_public_key_len(&self) -> usize;

    /// Generate a fresh keypair from caller randomness.
    fn generate_keypair(&self, rng: &mut dyn RngCore) -> KeyPair;

    /// Encode `public` so it is indistinguishable from random bytes.
    ///
    /// Returns `None` when this key has no hidden representation. The caller
    /// then draws a new keypair.
    fn hide_encode(&self, public: &[u8], rng: &mut dyn RngCore) -> Option<Vec<u8>>;

    /// Recover a marshaled public key from its hidden encoding.
    fn hide_decode(&self, hidden: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Diffie-Hellman between `private` and `public`, marshaled.
    fn diffie_hellman(
        &self,
        private: &[u8],
        public: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// Key length for X25519 public keys, private keys and shared values
pub const X25519_KEY_SIZE: usize = 32;

/// X25519 key agreement (RFC 7748).
///
/// Hidden keys from this suite are NOT indistinguishable from uniform random
/// bytes.
///
/// The hiding encoding fills the always-zero top bit of the little-endian
/// u-coordinate with a random bit. This is weaker than Elligator2: valid
/// u-coordinates cover about half of the field, so a large sample of
/// cornerstones is distinguishable from uniform bytes. A suite with full
/// Elligator2 hiding can replace this one without touching the layout code.
#[derive(Debug, Clone, Copy, Default)]
pub struct X25519Suite;

impl X25519Suite {
    /// Suite name reported by [`Suite::name`]
    pub const NAME: &'static str = "x25519";

    fn to_array(bytes: &[u8]) -> Result<[u8; X25519_KEY_SIZE], CryptoError> {
        bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: X25519_KEY_SIZE,
            actual: bytes.len(),
        })
    }
}

impl Suite for X25519Suite {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn hidden_public_key_len(&self) -> usize {
        X25519_KEY_SIZE
    }

    fn generate_keypair(&self, rng: &mut dyn RngCore) -> KeyPair {
        let mut seed = Zeroizing::new([0u8; X25519_KEY_SIZE]);
        rng.fill_bytes(&mut seed[..]);

        let secret = StaticSecret::from(*seed);
        let public = PublicKey::from(&secret);

        KeyPair {
            public: public.as_bytes().to_vec(),
            private: Zeroizing::new(secret.to_bytes().to_vec()),
        }
    }

    fn hide_encode(&self, public: &[u8], rng: &mut dyn RngCore) -> Option<Vec<u8>> {
        let mut hidden = Self::to_array(public).ok()?;

        // Canonical u-coordinates are below 2^255 - 19
        if hidden[X25519_KEY_SIZE - 1] & 0x80 != 0 {
            return None;
        }

        let mut coin = [0u8; 1];
        rng.fill_bytes(&mut coin);
        hidden[X25519_KEY_SIZE - 1] |= coin[0] & 0x80;

        Some(hidden.to_vec())
    }

    fn hide_decode(&self, hidden: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut public: [u8; X25519_KEY_SIZE] =
            hidden.try_into().map_err(|_| CryptoError::InvalidHiddenLength {
                expected: X25519_KEY_SIZE,
                actual: hidden.len(),
            })?;

        public[X25519_KEY_SIZE - 1] &= 0x7F;
        Ok(public.to_vec())
    }

    fn diffie_hellman(
        &self,
        private: &[u8],
        public: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let private = Zeroizing::new(Self::to_array(private)?);
        let secret = StaticSecret::from(*private);
        let public = PublicKey::from(Self::to_array(public)?);

        let shared = secret.diffie_hellman(&public);
        if !shared.was_contributory() {
            return Err(CryptoError::NonContributory);
        }

        Ok(Zeroizing::new(shared.as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn keypair_has_expected_lengths() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let kp = X25519Suite.generate_keypair(&mut rng);

        assert_eq!(kp.public.len(), X25519_KEY_SIZE);
        assert_eq!(kp.private.len(), X25519_KEY_SIZE);
    }

    #[test]
    fn diffie_hellman_agrees() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let alice = X25519Suite.generate_keypair(&mut rng);
        let bob = X25519Suite.generate_keypair(&mut rng);

        let ab = X25519Suite.diffie_hellman(&alice.private, &bob.public).unwrap();
        let ba = X25519Suite.diffie_hellman(&bob.private, &alice.public).unwrap();

        assert_eq!(*ab, *ba);
    }

    #[test]
    fn hide_roundtrip_recovers_public_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        for _ in 0..32 {
            let kp = X25519Suite.generate_keypair(&mut rng);
            let hidden = X25519Suite.hide_encode(&kp.public, &mut rng).unwrap();

            assert_eq!(hidden.len(), X25519Suite.hidden_public_key_len());
            assert_eq!(X25519Suite.hide_decode(&hidden).unwrap(), kp.public);
        }
    }

    #[test]
    fn hide_encode_randomizes_top_bit() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let kp = X25519Suite.generate_keypair(&mut rng);

        let mut seen_set = false;
        let mut seen_clear = false;
        for _ in 0..64 {
            let hidden = X25519Suite.hide_encode(&kp.public, &mut rng).unwrap();
            if hidden[X25519_KEY_SIZE - 1] & 0x80 == 0 {
                seen_clear = true;
            } else {
                seen_set = true;
            }
        }

        assert!(seen_set && seen_clear);
    }

    #[test]
    fn hidden_key_carries_the_raw_u_coordinate() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let kp = X25519Suite.generate_keypair(&mut rng);
        let hidden = X25519Suite.hide_encode(&kp.public, &mut rng).unwrap();

        // Only the top bit is masked, so the low 255 bits are the public key.
        assert_eq!(hidden[..X25519_KEY_SIZE - 1], kp.public[..X25519_KEY_SIZE - 1]);
        assert_eq!(hidden[X25519_KEY_SIZE - 1] & 0x7F, kp.public[X25519_KEY_SIZE - 1]);
    }

    #[test]
    fn hide_encode_rejects_wrong_length() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        assert!(X25519Suite.hide_encode(&[0u8; 31], &mut rng).is_none());
    }

    #[test]
    fn hide_decode_rejects_wrong_length() {
        let result = X25519Suite.hide_decode(&[0u8; 16]);
        assert_eq!(result, Err(CryptoError::InvalidHiddenLength { expected: 32, actual: 16 }));
    }

    #[test]
    fn diffie_hellman_rejects_low_order_point() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let kp = X25519Suite.generate_keypair(&mut rng);

        let result = X25519Suite.diffie_hellman(&kp.private, &[0u8; X25519_KEY_SIZE]);

        assert!(matches!(result, Err(CryptoError::NonContributory)));
    }

    #[test]
    fn diffie_hellman_rejects_short_keys() {
        let result = X25519Suite.diffie_hellman(&[0u8; 8], &[0u8; 32]);
        assert!(matches!(result, Err(CryptoError::InvalidKeyLength { expected: 32, actual: 8 })));
    }

    #[test]
    fn keypair_debug_hides_private_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let kp = X25519Suite.generate_keypair(&mut rng);

        let rendered = format!("{kp:?}");
        assert!(rendered.contains("redacted"));
    }
}
