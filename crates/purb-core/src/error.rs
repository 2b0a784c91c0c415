//! Error types for PURB encoding and decoding.
//!
//! Configuration bugs, placement exhaustion, decode misses and integrity
//! failures are distinct variants so callers can tell a misconfigured
//! `SuiteInfoMap` apart from a blob that simply was not meant for them.

use purb_crypto::CryptoError;
use thiserror::Error;

use crate::config::SuiteId;

/// Errors from PURB encoding and decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurbError {
    /// A recipient references a suite absent from the configuration
    #[error("no suite info configured for {suite}")]
    MissingSuiteInfo {
        /// Suite that was looked up
        suite: SuiteId,
    },

    /// Suite refused to hide-encode every keypair it generated
    #[error("{suite} produced no hideable keypair in {attempts} attempts")]
    UnhideableKeypair {
        /// Offending suite
        suite: SuiteId,
        /// Keypairs drawn before giving up
        attempts: usize,
    },

    /// A suite entry is malformed
    #[error("invalid suite info for {suite}: {reason}")]
    InvalidSuiteInfo {
        /// Offending suite
        suite: SuiteId,
        /// What is wrong with it
        reason: String,
    },

    /// Hidden public key length differs from the configured cornerstone
    /// length
    #[error("cornerstone length mismatch for {suite}: configured {expected}, suite encodes {actual}")]
    CornerstoneLengthMismatch {
        /// Offending suite
        suite: SuiteId,
        /// Configured `cornerstone_length`
        expected: usize,
        /// Length produced by the suite's hiding encoding
        actual: usize,
    },

    /// No assignment of primary cornerstone slots avoids a collision
    #[error("cornerstone placement unsatisfiable for {suites} suites")]
    UnsatisfiableCornerstonePlacement {
        /// Number of suites that had to be placed
        suites: usize,
    },

    /// Encode was called with an empty recipient list
    #[error("at least one recipient is required")]
    NoRecipients,

    /// Decode was called with a recipient that has no private key
    #[error("recipient has no private key")]
    MissingPrivateKey,

    /// Configuration failed validation or could not be deserialized
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with it
        reason: String,
    },

    /// Entrypoint hash tables grew past the maximum header length
    #[error("entrypoint tables for {suite} exceed max header length {max_header_length}")]
    EntrypointTableOverflow {
        /// Suite whose entrypoint could not be seated
        suite: SuiteId,
        /// Configured limit
        max_header_length: usize,
    },

    /// No candidate entrypoint decrypted under this recipient's key
    ///
    /// Expected outcome for a wrong recipient or a corrupted blob; the two
    /// cannot be told apart.
    #[error("no matching entrypoint")]
    NoMatchingEntrypoint,

    /// Global HMAC did not verify
    #[error("integrity tag mismatch")]
    TagMismatch,

    /// Decrypted payload is not well-formed
    #[error("malformed payload: {reason}")]
    MalformedPayload {
        /// What is wrong with it
        reason: String,
    },

    /// Sealed entrypoint length differs from the configured length
    #[error("entrypoint length mismatch for {suite}: configured {expected}, sealed {actual}")]
    EntrypointLengthMismatch {
        /// Offending suite
        suite: SuiteId,
        /// Configured `entrypoint_length`
        expected: usize,
        /// Length of the sealed entrypoint
        actual: usize,
    },

    /// Payload end offset does not fit the 32-bit entrypoint offsets
    #[error("payload end offset {length} exceeds the 32-bit offset range")]
    PayloadTooLarge {
        /// Offset one past the payload end
        length: usize,
    },

    /// Padding produced an empty payload region
    #[error("padded payload has zero length")]
    PayloadSizeZero,

    /// Cryptographic collaborator failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl PurbError {
    /// Returns true if this error stems from caller configuration.
    ///
    /// Retrying with the same configuration will fail the same way.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingSuiteInfo { .. }
                | Self::InvalidSuiteInfo { .. }
                | Self::CornerstoneLengthMismatch { .. }
                | Self::UnsatisfiableCornerstonePlacement { .. }
                | Self::NoRecipients
                | Self::MissingPrivateKey
                | Self::InvalidConfig { .. }
        )
    }

    /// Returns true if decoding simply found nothing for this recipient.
    ///
    /// Not an error condition for a caller trying several keys.
    pub fn is_decode_miss(&self) -> bool {
        matches!(self, Self::NoMatchingEntrypoint)
    }

    /// Returns true if this error aborts the current call.
    ///
    /// Everything except a decode miss is fatal. Invariant violations
    /// (`EntrypointLengthMismatch`, `PayloadSizeZero`) indicate a library
    /// bug rather than bad input.
    pub fn is_fatal(&self) -> bool {
        !self.is_decode_miss()
    }

    /// Returns true if an internal consistency check failed.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::EntrypointLengthMismatch { .. } | Self::PayloadSizeZero)
    }
}
