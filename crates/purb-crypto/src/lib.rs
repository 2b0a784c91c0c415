//! PURB Cryptographic Collaborators
//!
//! Cryptographic building blocks for PURB encoding. Pure functions with
//! deterministic outputs. Callers provide randomness, so tests can replay a
//! seeded RNG.
//!
//! # Key Hierarchy
//!
//! ```text
//! Ephemeral private key (per suite) x Recipient public key
//!        │
//!        ▼
//! Diffie-Hellman → KDF("")    → Shared Secret (per recipient)
//!        │
//!        ├─► KDF("pos") → hash-table bucket index
//!        └─► KDF("key") → Entrypoint AEAD key
//!                              │
//!                              ▼
//!                  AEAD(session key ‖ payload start ‖ payload end)
//!
//! Session key (per blob)
//!        ├─► KDF("enc") → ChaCha20 payload key
//!        └─► KDF("mac") → HMAC-SHA256 blob tag key
//! ```
//!
//! # Security
//!
//! Indistinguishability:
//! - Hidden public keys, AEAD ciphertexts and stream ciphertext all look
//!   uniform to anyone without a matching private key
//! - Padding is encrypted along with the payload
//!
//! Integrity:
//! - Entrypoints are authenticated by Poly1305
//! - The whole blob is authenticated by HMAC-SHA256, verified in constant
//!   time before the payload is decrypted

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod error;
pub mod kdf;
pub mod mac;
pub mod stream;
pub mod suite;

pub use aead::{AEAD_KEY_SIZE, AEAD_TAG_SIZE, NONCE_SIZE, open, seal};
pub use error::CryptoError;
pub use kdf::{KDF_OUTPUT_SIZE, KdfPurpose, derive, position_hash};
pub use mac::{MAC_TAG_SIZE, compute_tag, verify_tag};
pub use stream::{STREAM_KEY_SIZE, apply_keystream};
pub use suite::{KeyPair, Suite, X25519_KEY_SIZE, X25519Suite};
