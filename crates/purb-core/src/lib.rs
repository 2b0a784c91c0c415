//! PURB Encoder/Decoder
//!
//! Encodes one message for many recipients, possibly on different suites,
//! into a Padded Uniform Random Blob: a byte string that looks uniformly
//! random to anyone without a matching private key and whose length leaks
//! only its Padmé bucket.
//!
//! # Architecture
//!
//! ```text
//! encode(data, recipients, config, rng)
//!        │
//!        ▼
//! Header::build → cornerstones (one per suite), entrypoint secrets
//!        │
//!        ▼
//! place_cornerstones → place_entrypoints   (RegionLayout)
//!        │
//!        ▼
//! pad → ChaCha20 → serialize → XOR fold → HMAC tag
//!
//! decode(blob, recipient, config)
//!        │
//!        ▼
//! XOR fold → hide_decode → DH → probe sequence → AEAD open
//!        │
//!        ▼
//! verify tag → ChaCha20 → unpad
//! ```
//!
//! Encode and decode are pure functions of their inputs. Randomness is
//! passed in, so tests replay a seeded RNG and production passes `OsRng`.
//!
//! # Invariants
//!
//! - Exactly one cornerstone per distinct suite and one entrypoint per
//!   recipient.
//! - Exclusively reserved regions never overlap.
//! - The header layout is fixed before the padded length is computed.
//! - The blob length is a Padmé length and the tag never covers an allowed
//!   cornerstone position of a suite in use.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod header;
pub mod layout;
pub mod padding;
pub mod purb;
pub mod recipient;

pub use config::{
    DEFAULT_LINEAR_ATTEMPTS, DEFAULT_MAX_HEADER_LENGTH, ENTRYPOINT_LENGTH, EntrypointPlacement,
    MAC_LENGTH, NONCE_LENGTH, PurbConfig, SESSION_KEY_LENGTH, SuiteId, SuiteInfo, SuiteInfoMap,
};
pub use decode::{decode, recover_cornerstone};
pub use encode::encode;
pub use error::PurbError;
pub use header::{Cornerstone, EntryPoint, Header};
pub use layout::{Region, RegionLayout};
pub use padding::{pad, pad_to, padded_length, unpad};
pub use purb::Purb;
pub use recipient::Recipient;
