//! Public, out-of-band configuration shared by encoder and decoder.
//!
//! Every party must load a byte-identical [`PurbConfig`]; a mismatch is a
//! configuration bug, not a decode miss. [`PurbConfig::to_cbor`] and
//! [`PurbConfig::from_cbor`] exist so the configuration can be distributed
//! as a single canonical blob.

use std::{collections::BTreeMap, fmt, ops::Range};

use purb_crypto::{AEAD_TAG_SIZE, MAC_TAG_SIZE, NONCE_SIZE};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PurbError;

/// Length of the blob nonce at offset 0 (12 bytes)
pub const NONCE_LENGTH: usize = NONCE_SIZE;

/// Length of the per-blob session key (16 bytes)
pub const SESSION_KEY_LENGTH: usize = 16;

/// Length of each payload offset inside an entrypoint (big-endian `u32`)
pub const OFFSET_LENGTH: usize = 4;

/// Plaintext entrypoint content: session key, payload start, payload end
pub const ENTRYPOINT_CONTENT_LENGTH: usize = SESSION_KEY_LENGTH + 2 * OFFSET_LENGTH;

/// Sealed entrypoint length for suites using the built-in AEAD (40 bytes)
pub const ENTRYPOINT_LENGTH: usize = ENTRYPOINT_CONTENT_LENGTH + AEAD_TAG_SIZE;

/// Length of the trailing integrity tag (32 bytes)
pub const MAC_LENGTH: usize = MAC_TAG_SIZE;

/// Linear probes per hash table before the next table is tried
pub const DEFAULT_LINEAR_ATTEMPTS: usize = 3;

/// Hard upper bound on header length (1 MiB)
pub const DEFAULT_MAX_HEADER_LENGTH: usize = 1 << 20;

/// Maximum number of suites a configuration may declare
pub const MAX_SUITES: usize = 16;

/// Maximum number of allowed positions per suite
pub const MAX_POSITIONS_PER_SUITE: usize = 32;

/// Identifier of a suite entry in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteId(pub u16);

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "suite#{}", self.0)
    }
}

/// Per-suite public layout parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteInfo {
    /// Candidate cornerstone offsets, in preference order
    pub allowed_positions: Vec<usize>,
    /// Length of the hidden-encoded public key
    pub cornerstone_length: usize,
    /// Length of a sealed entrypoint
    pub entrypoint_length: usize,
}

impl SuiteInfo {
    /// Create suite info.
    pub fn new(
        allowed_positions: Vec<usize>,
        cornerstone_length: usize,
        entrypoint_length: usize,
    ) -> Self {
        Self { allowed_positions, cornerstone_length, entrypoint_length }
    }

    /// Byte ranges covered by each allowed position, in listed order.
    pub fn position_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.allowed_positions.iter().map(|&p| p..p.saturating_add(self.cornerstone_length))
    }

    /// Whether `[start, end)` intersects any allowed position.
    pub fn overlaps_positions(&self, start: usize, end: usize) -> bool {
        self.position_ranges().any(|r| r.start < end && start < r.end)
    }

    /// Offset of the first entrypoint hash table.
    ///
    /// Anchored at the first allowed position, not the primary one: the
    /// decoder cannot know which slot the encoder picked.
    pub fn table_anchor(&self) -> usize {
        self.allowed_positions
            .first()
            .map_or(NONCE_LENGTH, |&p| p.saturating_add(self.cornerstone_length))
    }

    fn validate(&self, suite: SuiteId) -> Result<(), PurbError> {
        let invalid = |reason: String| PurbError::InvalidSuiteInfo { suite, reason };

        if self.allowed_positions.is_empty() {
            return Err(invalid("no allowed positions".to_string()));
        }
        if self.allowed_positions.len() > MAX_POSITIONS_PER_SUITE {
            return Err(invalid(format!(
                "{} allowed positions, at most {MAX_POSITIONS_PER_SUITE}",
                self.allowed_positions.len()
            )));
        }
        if self.cornerstone_length == 0 {
            return Err(invalid("cornerstone length is zero".to_string()));
        }
        if self.entrypoint_length == 0 {
            return Err(invalid("entrypoint length is zero".to_string()));
        }
        if self.allowed_positions.iter().any(|p| p.checked_add(self.cornerstone_length).is_none())
        {
            return Err(invalid("allowed position overflows".to_string()));
        }

        // Writing the primary must not disturb the other positions it is
        // XORed with.
        let mut ranges: Vec<Range<usize>> = self.position_ranges().collect();
        ranges.sort_by_key(|r| r.start);
        if let Some(pair) = ranges.windows(2).find(|w| w[0].end > w[1].start) {
            return Err(invalid(format!(
                "allowed positions {} and {} overlap",
                pair[0].start, pair[1].start
            )));
        }

        Ok(())
    }
}

/// Ordered map from suite id to its layout parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteInfoMap(BTreeMap<SuiteId, SuiteInfo>);

impl SuiteInfoMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `suite`.
    pub fn insert(&mut self, suite: SuiteId, info: SuiteInfo) -> Option<SuiteInfo> {
        self.0.insert(suite, info)
    }

    /// Look up the entry for `suite`.
    pub fn get(&self, suite: SuiteId) -> Option<&SuiteInfo> {
        self.0.get(&suite)
    }

    /// Look up the entry for `suite`, failing with `MissingSuiteInfo`.
    pub fn require(&self, suite: SuiteId) -> Result<&SuiteInfo, PurbError> {
        self.get(suite).ok_or(PurbError::MissingSuiteInfo { suite })
    }

    /// Entries sorted by suite id.
    pub fn iter(&self) -> impl Iterator<Item = (SuiteId, &SuiteInfo)> {
        self.0.iter().map(|(id, info)| (*id, info))
    }

    /// Number of configured suites.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no suites are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check every entry and the suite count.
    pub fn validate(&self) -> Result<(), PurbError> {
        if self.0.len() > MAX_SUITES {
            return Err(PurbError::InvalidConfig {
                reason: format!("{} suites configured, at most {MAX_SUITES}", self.0.len()),
            });
        }

        for (id, info) in self.iter() {
            info.validate(id)?;
        }

        Ok(())
    }

    /// Build a map where every suite's cornerstone can always be placed.
    ///
    /// Positions are grouped in levels starting right after the nonce. Level
    /// `i` holds `2^i` slots of `cornerstone_length` bytes and suite `k` uses
    /// slot `k mod 2^i`. With `ceil(log2 n) + 1` levels the last level gives
    /// every suite a private slot, while the early levels let small suite
    /// sets share short headers.
    pub fn staggered(
        suites: &[SuiteId],
        cornerstone_length: usize,
        entrypoint_length: usize,
    ) -> Self {
        let levels = match suites.len() {
            0 | 1 => 1,
            n => n.next_power_of_two().trailing_zeros() as usize + 1,
        };

        let mut map = Self::new();
        for (k, &suite) in suites.iter().enumerate() {
            let mut positions = Vec::with_capacity(levels);
            let mut floor = NONCE_LENGTH;
            for level in 0..levels {
                let slots = 1usize << level;
                positions.push(floor + (k % slots) * cornerstone_length);
                floor += slots * cornerstone_length;
            }
            map.insert(suite, SuiteInfo::new(positions, cornerstone_length, entrypoint_length));
        }
        map
    }
}

/// How entrypoints are laid out after the cornerstones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrypointPlacement {
    /// Doubling hash tables with linear probing
    #[default]
    HashTables,
    /// Consecutive slots from the table anchor; larger headers on average,
    /// kept for comparison and for tiny recipient sets
    Linear,
}

/// Complete encoder/decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurbConfig {
    /// Layout parameters per suite
    pub suites: SuiteInfoMap,
    /// Entrypoint placement strategy
    pub placement: EntrypointPlacement,
    /// Buckets probed in each hash table
    pub linear_attempts: usize,
    /// Header length at which entrypoint placement gives up
    pub max_header_length: usize,
}

impl Default for PurbConfig {
    fn default() -> Self {
        Self {
            suites: SuiteInfoMap::default(),
            placement: EntrypointPlacement::default(),
            linear_attempts: DEFAULT_LINEAR_ATTEMPTS,
            max_header_length: DEFAULT_MAX_HEADER_LENGTH,
        }
    }
}

impl PurbConfig {
    /// Configuration with default placement parameters.
    pub fn new(suites: SuiteInfoMap) -> Self {
        Self { suites, ..Self::default() }
    }

    /// Use `placement` for entrypoints.
    #[must_use]
    pub fn with_placement(mut self, placement: EntrypointPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Probe `attempts` buckets per hash table.
    #[must_use]
    pub fn with_linear_attempts(mut self, attempts: usize) -> Self {
        self.linear_attempts = attempts;
        self
    }

    /// Cap the header at `max` bytes.
    #[must_use]
    pub fn with_max_header_length(mut self, max: usize) -> Self {
        self.max_header_length = max;
        self
    }

    /// Reject configurations that could stall or corrupt placement.
    pub fn validate(&self) -> Result<(), PurbError> {
        let result = self.validate_inner();
        if let Err(err) = &result {
            warn!(error = %err, "configuration rejected");
        }
        result
    }

    fn validate_inner(&self) -> Result<(), PurbError> {
        if self.linear_attempts == 0 {
            return Err(PurbError::InvalidConfig {
                reason: "linear attempts must be at least 1".to_string(),
            });
        }
        if self.max_header_length < NONCE_LENGTH {
            return Err(PurbError::InvalidConfig {
                reason: format!(
                    "max header length {} is smaller than the nonce",
                    self.max_header_length
                ),
            });
        }
        if self.max_header_length > u32::MAX as usize {
            return Err(PurbError::InvalidConfig {
                reason: "max header length exceeds payload offset range".to_string(),
            });
        }
        self.suites.validate()?;

        for (suite, info) in self.suites.iter() {
            let past_header = info
                .allowed_positions
                .iter()
                .find(|&&p| p.saturating_add(info.cornerstone_length) > self.max_header_length);
            if let Some(position) = past_header {
                return Err(PurbError::InvalidSuiteInfo {
                    suite,
                    reason: format!(
                        "allowed position {position} ends past max header length {}",
                        self.max_header_length
                    ),
                });
            }
        }

        Ok(())
    }

    /// Serialize to CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>, PurbError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| PurbError::InvalidConfig { reason: e.to_string() })?;
        Ok(bytes)
    }

    /// Deserialize from CBOR and validate.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, PurbError> {
        let config: Self = ciborium::from_reader(bytes)
            .map_err(|e| PurbError::InvalidConfig { reason: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }
}
