//! PURB header: cornerstones, entrypoints and their layout.
//!
//! A header is built in three steps:
//!
//! 1. [`Header::build`] draws one ephemeral keypair per distinct suite (the
//!    cornerstone) and derives one shared secret per recipient (the
//!    entrypoint).
//! 2. [`cornerstone::place_cornerstones`] picks a primary slot for every
//!    cornerstone by backtracking over the allowed positions.
//! 3. [`entrypoint::place_entrypoints`] seats every entrypoint in the
//!    doubling hash tables.
//!
//! Once placed, [`Header::length`] is the offset where the payload begins.

pub mod cornerstone;
pub mod entrypoint;

use std::{
    collections::{BTreeMap, btree_map::Entry},
    fmt,
};

use purb_crypto::{KDF_OUTPUT_SIZE, KdfPurpose, KeyPair, Suite, derive};
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use crate::{
    config::{NONCE_LENGTH, PurbConfig, SuiteId},
    error::PurbError,
    layout::RegionLayout,
    recipient::Recipient,
};

/// Keypairs drawn per suite before giving up on the hiding encoding
pub const MAX_KEYGEN_ATTEMPTS: usize = 64;

/// Ephemeral key material of one suite.
pub struct Cornerstone {
    /// Suite this cornerstone serves
    pub suite_id: SuiteId,
    /// Ephemeral keypair, generated once per blob
    pub keypair: KeyPair,
    /// Hidden encoding of the public key, `cornerstone_length` bytes
    pub encoded: Vec<u8>,
    /// Primary slot, once placed
    pub offset: Option<usize>,
}

impl Cornerstone {
    /// One past the last byte of the primary slot, once placed.
    pub fn end_offset(&self) -> Option<usize> {
        self.offset.map(|o| o + self.encoded.len())
    }
}

impl fmt::Debug for Cornerstone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cornerstone")
            .field("suite_id", &self.suite_id)
            .field("length", &self.encoded.len())
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

/// One recipient's slot holding the sealed session key.
pub struct EntryPoint {
    /// Index of the recipient in the slice passed to the encoder
    pub recipient: usize,
    /// Suite of the recipient
    pub suite_id: SuiteId,
    /// `KDF("", DH)` between the cornerstone and the recipient
    pub shared_secret: Zeroizing<[u8; KDF_OUTPUT_SIZE]>,
    /// Start of the slot, once placed
    pub offset: Option<usize>,
    /// Sealed entrypoint length
    pub length: usize,
}

impl EntryPoint {
    /// One past the last byte of the slot, once placed.
    pub fn end_offset(&self) -> Option<usize> {
        self.offset.map(|o| o + self.length)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("recipient", &self.recipient)
            .field("suite_id", &self.suite_id)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Header under construction or fully placed.
#[derive(Debug)]
pub struct Header {
    cornerstones: BTreeMap<SuiteId, Cornerstone>,
    entrypoints: BTreeMap<SuiteId, Vec<EntryPoint>>,
    placement_order: Vec<SuiteId>,
    layout: RegionLayout,
}

impl Header {
    /// Generate cornerstones and derive entrypoint secrets.
    ///
    /// Nothing is placed yet.
    ///
    /// # Errors
    ///
    /// - `MissingSuiteInfo`: if a recipient's suite is not configured.
    /// - `CornerstoneLengthMismatch`: if a suite's hidden key length differs
    ///   from the configured cornerstone length.
    /// - `UnhideableKeypair`: if a suite keeps refusing to hide its keys.
    /// - `Crypto`: if Diffie-Hellman with a recipient key fails.
    pub fn build(
        recipients: &[Recipient],
        config: &PurbConfig,
        rng: &mut dyn RngCore,
    ) -> Result<Self, PurbError> {
        let mut cornerstones = BTreeMap::new();
        let mut entrypoints: BTreeMap<SuiteId, Vec<EntryPoint>> = BTreeMap::new();

        for (index, recipient) in recipients.iter().enumerate() {
            let info = config.suites.require(recipient.suite_id)?;

            let cornerstone = match cornerstones.entry(recipient.suite_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(new_cornerstone(
                    recipient.suite_id,
                    recipient.suite.as_ref(),
                    info.cornerstone_length,
                    rng,
                )?),
            };

            let dh = recipient
                .suite
                .diffie_hellman(&cornerstone.keypair.private, &recipient.public_key)?;
            let shared_secret = Zeroizing::new(derive(KdfPurpose::SharedSecret, &dh));

            entrypoints.entry(recipient.suite_id).or_default().push(EntryPoint {
                recipient: index,
                suite_id: recipient.suite_id,
                shared_secret,
                offset: None,
                length: info.entrypoint_length,
            });
        }

        debug!(
            suites = cornerstones.len(),
            recipients = recipients.len(),
            "header material generated"
        );

        Ok(Self {
            cornerstones,
            entrypoints,
            placement_order: Vec::new(),
            layout: RegionLayout::new(),
        })
    }

    /// Run cornerstone placement, then entrypoint placement.
    pub fn place(&mut self, config: &PurbConfig) -> Result<(), PurbError> {
        cornerstone::place_cornerstones(self, &config.suites)?;
        entrypoint::place_entrypoints(self, config)
    }

    /// Offset where the payload begins.
    ///
    /// Maximum end offset over the nonce and everything placed so far.
    pub fn length(&self) -> usize {
        let cornerstones = self.cornerstones.values().filter_map(Cornerstone::end_offset);
        let entrypoints = self.entrypoints.values().flatten().filter_map(EntryPoint::end_offset);

        cornerstones.chain(entrypoints).fold(NONCE_LENGTH, usize::max)
    }

    /// Cornerstones keyed by suite.
    pub fn cornerstones(&self) -> &BTreeMap<SuiteId, Cornerstone> {
        &self.cornerstones
    }

    /// Entrypoints grouped by suite.
    pub fn entrypoints(&self) -> &BTreeMap<SuiteId, Vec<EntryPoint>> {
        &self.entrypoints
    }

    /// Suites in the order their cornerstones were placed.
    pub fn placement_order(&self) -> &[SuiteId] {
        &self.placement_order
    }

    /// Layout of exclusively reserved regions.
    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }
}

fn new_cornerstone(
    suite_id: SuiteId,
    suite: &dyn Suite,
    cornerstone_length: usize,
    rng: &mut dyn RngCore,
) -> Result<Cornerstone, PurbError> {
    if suite.hidden_public_key_len() != cornerstone_length {
        return Err(PurbError::CornerstoneLengthMismatch {
            suite: suite_id,
            expected: cornerstone_length,
            actual: suite.hidden_public_key_len(),
        });
    }

    for _ in 0..MAX_KEYGEN_ATTEMPTS {
        let keypair = suite.generate_keypair(rng);
        let Some(encoded) = suite.hide_encode(&keypair.public, rng) else {
            continue;
        };

        if encoded.len() != cornerstone_length {
            return Err(PurbError::CornerstoneLengthMismatch {
                suite: suite_id,
                expected: cornerstone_length,
                actual: encoded.len(),
            });
        }

        return Ok(Cornerstone { suite_id, keypair, encoded, offset: None });
    }

    Err(PurbError::UnhideableKeypair { suite: suite_id, attempts: MAX_KEYGEN_ATTEMPTS })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use purb_crypto::{CryptoError, X25519Suite};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::config::{ENTRYPOINT_LENGTH, SuiteInfo, SuiteInfoMap};

    /// Suite whose hiding encoding always refuses.
    #[derive(Debug)]
    struct StubbornSuite;

    impl Suite for StubbornSuite {
        fn name(&self) -> &'static str {
            "stubborn"
        }

        fn hidden_public_key_len(&self) -> usize {
            32
        }

        fn generate_keypair(&self, rng: &mut dyn RngCore) -> KeyPair {
            X25519Suite.generate_keypair(rng)
        }

        fn hide_encode(&self, _public: &[u8], _rng: &mut dyn RngCore) -> Option<Vec<u8>> {
            None
        }

        fn hide_decode(&self, hidden: &[u8]) -> Result<Vec<u8>, CryptoError> {
            X25519Suite.hide_decode(hidden)
        }

        fn diffie_hellman(
            &self,
            private: &[u8],
            public: &[u8],
        ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
            X25519Suite.diffie_hellman(private, public)
        }
    }

    fn config_for(ids: &[SuiteId], cornerstone_length: usize) -> PurbConfig {
        PurbConfig::new(SuiteInfoMap::staggered(ids, cornerstone_length, ENTRYPOINT_LENGTH))
    }

    #[test]
    fn one_cornerstone_per_suite_one_entrypoint_per_recipient() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let suite: Arc<dyn Suite> = Arc::new(X25519Suite);
        let recipients: Vec<Recipient> = [0, 1, 0, 1, 1]
            .into_iter()
            .map(|id| Recipient::generate(SuiteId(id), Arc::clone(&suite), &mut rng))
            .collect();

        let config = config_for(&[SuiteId(0), SuiteId(1)], 32);
        let header = Header::build(&recipients, &config, &mut rng).unwrap();

        assert_eq!(header.cornerstones().len(), 2);
        assert_eq!(header.entrypoints()[&SuiteId(0)].len(), 2);
        assert_eq!(header.entrypoints()[&SuiteId(1)].len(), 3);

        let mut indices: Vec<usize> =
            header.entrypoints().values().flatten().map(|e| e.recipient).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn unplaced_header_is_just_the_nonce() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let r = Recipient::generate(SuiteId(0), Arc::new(X25519Suite), &mut rng);

        let header = Header::build(&[r], &config_for(&[SuiteId(0)], 32), &mut rng).unwrap();

        assert_eq!(header.length(), NONCE_LENGTH);
    }

    #[test]
    fn missing_suite_info_is_reported() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let r = Recipient::generate(SuiteId(5), Arc::new(X25519Suite), &mut rng);

        let err = Header::build(&[r], &config_for(&[SuiteId(0)], 32), &mut rng).unwrap_err();

        assert_eq!(err, PurbError::MissingSuiteInfo { suite: SuiteId(5) });
    }

    #[test]
    fn cornerstone_length_must_match_suite() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let r = Recipient::generate(SuiteId(0), Arc::new(X25519Suite), &mut rng);

        let mut suites = SuiteInfoMap::new();
        suites.insert(SuiteId(0), SuiteInfo::new(vec![12], 48, ENTRYPOINT_LENGTH));
        let err = Header::build(&[r], &PurbConfig::new(suites), &mut rng).unwrap_err();

        assert!(matches!(
            err,
            PurbError::CornerstoneLengthMismatch { expected: 48, actual: 32, .. }
        ));
    }

    #[test]
    fn refusing_suite_gives_up() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let kp = X25519Suite.generate_keypair(&mut rng);
        let r = Recipient::from_keypair(SuiteId(0), Arc::new(StubbornSuite), kp);

        let err = Header::build(&[r], &config_for(&[SuiteId(0)], 32), &mut rng).unwrap_err();

        assert!(matches!(err, PurbError::UnhideableKeypair { attempts: MAX_KEYGEN_ATTEMPTS, .. }));
    }

    #[test]
    fn low_order_recipient_key_is_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let r = Recipient::new(SuiteId(0), Arc::new(X25519Suite), vec![0u8; 32]);

        let err = Header::build(&[r], &config_for(&[SuiteId(0)], 32), &mut rng).unwrap_err();

        assert_eq!(err, PurbError::Crypto(CryptoError::NonContributory));
    }
}
