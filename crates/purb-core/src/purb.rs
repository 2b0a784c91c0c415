//! The encoded artifact.

use std::fmt::{self, Write as _};

use zeroize::Zeroizing;

use crate::{
    config::{MAC_LENGTH, NONCE_LENGTH, SESSION_KEY_LENGTH, SuiteInfoMap},
    header::Header,
};

/// An encoded PURB together with the state that produced it.
///
/// Only [`Purb::as_bytes`] is meant to leave the encoder; the rest is kept
/// for inspection and tests.
pub struct Purb {
    pub(crate) nonce: [u8; NONCE_LENGTH],
    pub(crate) header: Header,
    pub(crate) payload: Vec<u8>,
    pub(crate) session_key: Zeroizing<[u8; SESSION_KEY_LENGTH]>,
    pub(crate) suites: SuiteInfoMap,
    pub(crate) blob: Vec<u8>,
}

impl Purb {
    /// Blob nonce.
    pub fn nonce(&self) -> &[u8; NONCE_LENGTH] {
        &self.nonce
    }

    /// Placed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Encrypted and padded payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Session key protecting the payload.
    pub fn session_key(&self) -> &[u8; SESSION_KEY_LENGTH] {
        &self.session_key
    }

    /// Serialized blob, tag included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.blob
    }

    /// Copy of the serialized blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.blob.clone()
    }

    /// Consume the artifact, keeping only the serialized blob.
    pub fn into_bytes(self) -> Vec<u8> {
        self.blob
    }

    /// Total blob length.
    pub fn len(&self) -> usize {
        self.blob.len()
    }

    /// Always false: a blob holds at least the nonce and the tag.
    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }

    /// Byte range of the encrypted payload.
    pub fn payload_range(&self) -> std::ops::Range<usize> {
        let start = self.header.length();
        start..start + self.payload.len()
    }

    /// Human-readable map of the blob.
    ///
    /// Lists offsets, lengths and allowed positions. Contains no key
    /// material, only where things sit.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let payload = self.payload_range();

        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "PURB {} bytes: header {}, payload {}, tag {}",
            self.blob.len(),
            self.header.length(),
            payload.len(),
            MAC_LENGTH
        );
        let _ = writeln!(out, "  [{:>6}, {:>6}) nonce", 0, NONCE_LENGTH);

        for &suite in self.header.placement_order() {
            let Some(cornerstone) = self.header.cornerstones().get(&suite) else {
                continue;
            };
            if let (Some(start), Some(end)) = (cornerstone.offset, cornerstone.end_offset()) {
                let allowed =
                    self.suites.get(suite).map(|i| i.allowed_positions.clone()).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  [{start:>6}, {end:>6}) {suite} cornerstone, allowed {allowed:?}"
                );
            }
        }

        let mut entrypoints: Vec<_> = self
            .header
            .entrypoints()
            .values()
            .flatten()
            .filter_map(|e| Some((e.offset?, e.end_offset()?, e.suite_id, e.recipient)))
            .collect();
        entrypoints.sort_unstable();
        for (start, end, suite, recipient) in entrypoints {
            let _ = writeln!(
                out,
                "  [{start:>6}, {end:>6}) {suite} entrypoint for recipient {recipient}"
            );
        }

        let _ = writeln!(out, "  [{:>6}, {:>6}) payload", payload.start, payload.end);
        let _ = writeln!(out, "  [{:>6}, {:>6}) tag", payload.end, self.blob.len());
        out
    }
}

impl fmt::Debug for Purb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Purb")
            .field("len", &self.blob.len())
            .field("header_length", &self.header.length())
            .field("payload_length", &self.payload.len())
            .finish_non_exhaustive()
    }
}
