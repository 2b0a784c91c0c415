//! Purpose-bound key derivation using HKDF

use hkdf::Hkdf;
use sha2::Sha256;

/// Size of every derived key (32 bytes)
pub const KDF_OUTPUT_SIZE: usize = 32;

/// What a derived key is used for.
///
/// Each purpose maps to a distinct HKDF `info` label, so the same seed never
/// yields the same bytes for two different uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KdfPurpose {
    /// Entrypoint shared secret, derived from the raw Diffie-Hellman output
    SharedSecret,
    /// Hash-table bucket index, derived from the shared secret
    Position,
    /// Entrypoint AEAD key, derived from the shared secret
    EntrypointKey,
    /// Payload stream-cipher key, derived from the session key
    PayloadKey,
    /// Blob HMAC key, derived from the session key
    MacKey,
}

impl KdfPurpose {
    /// HKDF `info` label for this purpose.
    pub fn label(self) -> &'static [u8] {
        match self {
            Self::SharedSecret => b"",
            Self::Position => b"pos",
            Self::EntrypointKey => b"key",
            Self::PayloadKey => b"enc",
            Self::MacKey => b"mac",
        }
    }
}

/// Derive a 32-byte key for `purpose` from `seed`.
///
/// Deterministic: the same purpose and seed always produce the same output.
/// Any seed length is accepted, including empty.
pub fn derive(purpose: KdfPurpose, seed: &[u8]) -> [u8; KDF_OUTPUT_SIZE] {
    let hkdf = Hkdf::<Sha256>::new(None, seed);

    let mut out = [0u8; KDF_OUTPUT_SIZE];
    let Ok(()) = hkdf.expand(purpose.label(), &mut out) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    out
}

/// Derive the pseudo-random bucket index for an entrypoint.
///
/// The first four bytes of `derive(Position, shared_secret)`, big-endian.
pub fn position_hash(shared_secret: &[u8]) -> u32 {
    let digest = derive(KdfPurpose::Position, shared_secret);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
