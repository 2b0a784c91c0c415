//! Error types for the cryptographic collaborators

use thiserror::Error;

/// Errors from key agreement, hiding encoding and symmetric primitives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Invalid key material length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length
        expected: usize,
        /// Actual key length
        actual: usize,
    },

    /// Hidden encoding has the wrong length for this suite
    #[error("invalid hidden encoding length: expected {expected}, got {actual}")]
    InvalidHiddenLength {
        /// Expected encoding length
        expected: usize,
        /// Actual encoding length
        actual: usize,
    },

    /// Diffie-Hellman produced a low-order (all zero) shared value
    #[error("key agreement is not contributory")]
    NonContributory,

    /// AEAD authentication failed (wrong key, wrong bucket or tampering)
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if this error is caused by misused key material.
    ///
    /// Length errors mean the caller handed bytes from the wrong suite and
    /// will never succeed on a different blob. Authentication failures and
    /// degenerate key agreements are what tampered or foreign blobs produce.
    pub fn is_key_misuse(&self) -> bool {
        match self {
            Self::InvalidKeyLength { .. } | Self::InvalidHiddenLength { .. } => true,
            Self::NonContributory | Self::DecryptionFailed { .. } => false,
        }
    }
}
