//! Entrypoint placement and content.
//!
//! An entrypoint's slot is never written down. Encoder and decoder both walk
//! the same [`ProbeSequence`], derived from the shared secret alone: the
//! encoder takes the first slot it can reserve, the decoder trial-decrypts
//! each slot until one opens.

use purb_crypto::position_hash;
use tracing::{debug, trace};

use super::Header;
use crate::{
    config::{
        ENTRYPOINT_CONTENT_LENGTH, EntrypointPlacement, OFFSET_LENGTH, PurbConfig,
        SESSION_KEY_LENGTH, SuiteId,
    },
    error::PurbError,
};

/// One candidate slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Start of the hash table the slot belongs to
    pub table_base: usize,
    /// Start of the slot
    pub offset: usize,
}

impl Probe {
    /// Whether a slot of `length` bytes at the table base ends within
    /// `limit`. Once false, every later probe is out of range too.
    pub fn table_fits(&self, length: usize, limit: usize) -> bool {
        self.table_base.checked_add(length).is_some_and(|end| end <= limit)
    }

    /// Whether this slot of `length` bytes ends within `limit`.
    pub fn slot_fits(&self, length: usize, limit: usize) -> bool {
        self.offset.checked_add(length).is_some_and(|end| end <= limit)
    }
}

/// Candidate slots for one entrypoint, in probing order.
///
/// With [`EntrypointPlacement::HashTables`], tables of `1, 2, 4, …` slots
/// are laid out back to back from the suite's table anchor. In a table of
/// `T` slots the buckets `(h + j) mod T` are tried for
/// `j < min(linear_attempts, T)`, then the next table follows.
///
/// With [`EntrypointPlacement::Linear`], slots are consecutive.
///
/// The sequence is unbounded; it ends only on arithmetic overflow. Callers
/// stop once [`Probe::table_base`] passes their limit.
#[derive(Debug, Clone)]
pub struct ProbeSequence {
    strategy: EntrypointPlacement,
    hash: usize,
    entry_length: usize,
    linear_attempts: usize,
    table_base: usize,
    table_size: usize,
    attempt: usize,
}

impl ProbeSequence {
    /// Probe sequence for a recipient with `shared_secret`.
    pub fn new(
        shared_secret: &[u8],
        anchor: usize,
        entry_length: usize,
        config: &PurbConfig,
    ) -> Self {
        Self {
            strategy: config.placement,
            hash: position_hash(shared_secret) as usize,
            entry_length,
            linear_attempts: config.linear_attempts.max(1),
            table_base: anchor,
            table_size: 1,
            attempt: 0,
        }
    }

    fn next_hashed(&mut self) -> Option<Probe> {
        if self.attempt >= self.linear_attempts.min(self.table_size) {
            let table_bytes = self.table_size.checked_mul(self.entry_length)?;
            self.table_base = self.table_base.checked_add(table_bytes)?;
            self.table_size = self.table_size.checked_mul(2)?;
            self.attempt = 0;
        }

        let bucket = (self.hash % self.table_size + self.attempt) % self.table_size;
        self.attempt += 1;

        let offset = bucket
            .checked_mul(self.entry_length)
            .and_then(|delta| self.table_base.checked_add(delta))?;
        Some(Probe { table_base: self.table_base, offset })
    }

    fn next_linear(&mut self) -> Option<Probe> {
        let offset = self.table_base;
        self.table_base = self.table_base.checked_add(self.entry_length)?;
        Some(Probe { table_base: offset, offset })
    }
}

impl Iterator for ProbeSequence {
    type Item = Probe;

    fn next(&mut self) -> Option<Probe> {
        match self.strategy {
            EntrypointPlacement::HashTables => self.next_hashed(),
            EntrypointPlacement::Linear => self.next_linear(),
        }
    }
}

/// Seat every entrypoint in `header`.
///
/// Must run after cornerstone placement, on the same layout.
///
/// # Errors
///
/// - `MissingSuiteInfo`: if an entrypoint's suite is not configured.
/// - `EntrypointTableOverflow`: if no slot fits below the maximum header
///   length.
pub fn place_entrypoints(header: &mut Header, config: &PurbConfig) -> Result<(), PurbError> {
    let layout = &mut header.layout;

    for (&suite, entrypoints) in &mut header.entrypoints {
        let info = config.suites.require(suite)?;
        let anchor = info.table_anchor();

        for entrypoint in entrypoints.iter_mut() {
            let length = entrypoint.length;
            let label = format!("{suite} entrypoint {}", entrypoint.recipient);
            let mut probes = 0usize;

            let probe_seq =
                ProbeSequence::new(entrypoint.shared_secret.as_slice(), anchor, length, config);

            let mut placed = None;
            for probe in probe_seq {
                if !probe.table_fits(length, config.max_header_length) {
                    break;
                }
                probes += 1;
                if !probe.slot_fits(length, config.max_header_length) {
                    continue;
                }
                if layout.reserve(probe.offset, probe.offset + length, true, label.as_str()) {
                    placed = Some(probe.offset);
                    break;
                }
                trace!(%suite, offset = probe.offset, "entrypoint slot taken");
            }

            let Some(offset) = placed else {
                return Err(overflow(suite, config));
            };

            entrypoint.offset = Some(offset);
            debug!(%suite, recipient = entrypoint.recipient, offset, probes, "entrypoint placed");
        }
    }

    Ok(())
}

fn overflow(suite: SuiteId, config: &PurbConfig) -> PurbError {
    PurbError::EntrypointTableOverflow { suite, max_header_length: config.max_header_length }
}

/// Plaintext sealed inside an entrypoint.
///
/// Wire form is `session_key ‖ start ‖ end`, offsets as big-endian `u32`.
#[derive(Clone, PartialEq, Eq)]
pub struct EntrypointContent {
    /// Per-blob session key
    pub session_key: [u8; SESSION_KEY_LENGTH],
    /// Offset where the payload starts
    pub payload_start: u32,
    /// Offset one past the payload end
    pub payload_end: u32,
}

impl EntrypointContent {
    /// Serialize to wire form.
    pub fn to_bytes(&self) -> [u8; ENTRYPOINT_CONTENT_LENGTH] {
        let mut out = [0u8; ENTRYPOINT_CONTENT_LENGTH];
        let (key, offsets) = out.split_at_mut(SESSION_KEY_LENGTH);
        key.copy_from_slice(&self.session_key);
        offsets[..OFFSET_LENGTH].copy_from_slice(&self.payload_start.to_be_bytes());
        offsets[OFFSET_LENGTH..].copy_from_slice(&self.payload_end.to_be_bytes());
        out
    }

    /// Parse wire form.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload`: if `bytes` has the wrong length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PurbError> {
        if bytes.len() != ENTRYPOINT_CONTENT_LENGTH {
            return Err(PurbError::MalformedPayload {
                reason: format!(
                    "entrypoint content is {} bytes, expected {ENTRYPOINT_CONTENT_LENGTH}",
                    bytes.len()
                ),
            });
        }

        let mut session_key = [0u8; SESSION_KEY_LENGTH];
        session_key.copy_from_slice(&bytes[..SESSION_KEY_LENGTH]);

        let start = &bytes[SESSION_KEY_LENGTH..SESSION_KEY_LENGTH + OFFSET_LENGTH];
        let end = &bytes[SESSION_KEY_LENGTH + OFFSET_LENGTH..];

        Ok(Self {
            session_key,
            payload_start: u32::from_be_bytes([start[0], start[1], start[2], start[3]]),
            payload_end: u32::from_be_bytes([end[0], end[1], end[2], end[3]]),
        })
    }
}

impl Drop for EntrypointContent {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.session_key);
    }
}

impl std::fmt::Debug for EntrypointContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntrypointContent")
            .field("payload_start", &self.payload_start)
            .field("payload_end", &self.payload_end)
            .finish_non_exhaustive()
    }
}
