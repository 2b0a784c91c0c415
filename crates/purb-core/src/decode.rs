//! PURB decoding by trial decryption.
//!
//! The decoder never learns which slots the encoder used. It folds every
//! allowed position of its suite into the cornerstone, derives the shared
//! secret, then walks the same probe sequence as the encoder until an
//! entrypoint opens under its key.

use purb_crypto::{CryptoError, KdfPurpose, apply_keystream, derive, open, verify_tag};
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::{
    config::{MAC_LENGTH, NONCE_LENGTH, PurbConfig, SuiteInfo},
    error::PurbError,
    header::{
        cornerstone::fold_positions,
        entrypoint::{EntrypointContent, ProbeSequence},
    },
    padding::unpad,
    recipient::Recipient,
};

/// Recover the hidden cornerstone of `info`'s suite from a blob's data
/// region (the blob without its tag).
pub fn recover_cornerstone(data: &[u8], info: &SuiteInfo) -> Vec<u8> {
    fold_positions(data, info, None)
}

/// Decode `blob` for `recipient`.
///
/// # Errors
///
/// - `MissingSuiteInfo`: if the recipient's suite is not configured.
/// - `MissingPrivateKey`: if the recipient has no private key.
/// - `CornerstoneLengthMismatch`: if the suite and configuration disagree.
/// - `NoMatchingEntrypoint`: if no entrypoint opens. Expected for a blob
///   addressed to someone else and for a corrupted blob.
/// - `TagMismatch`: if an entrypoint opened but the blob fails its tag.
/// - `MalformedPayload`: if the authenticated payload is ill-formed.
pub fn decode(
    blob: &[u8],
    recipient: &Recipient,
    config: &PurbConfig,
) -> Result<Vec<u8>, PurbError> {
    let suite_id = recipient.suite_id;
    let info = config.suites.require(suite_id)?;
    let private_key = recipient.private_key.as_ref().ok_or(PurbError::MissingPrivateKey)?;

    let hidden_len = recipient.suite.hidden_public_key_len();
    if hidden_len != info.cornerstone_length {
        return Err(PurbError::CornerstoneLengthMismatch {
            suite: suite_id,
            expected: info.cornerstone_length,
            actual: hidden_len,
        });
    }

    if blob.len() < NONCE_LENGTH + MAC_LENGTH {
        debug!(len = blob.len(), "blob too short");
        return Err(PurbError::NoMatchingEntrypoint);
    }
    let (data, tag) = blob.split_at(blob.len() - MAC_LENGTH);
    let mut nonce = [0u8; NONCE_LENGTH];
    nonce.copy_from_slice(&data[..NONCE_LENGTH]);

    let hidden = recover_cornerstone(data, info);
    let dh = match recipient
        .suite
        .hide_decode(&hidden)
        .and_then(|public| recipient.suite.diffie_hellman(private_key, &public))
    {
        Ok(dh) => dh,
        Err(err) if err.is_key_misuse() => return Err(err.into()),
        Err(err) => {
            debug!(%suite_id, error = %err, "cornerstone unusable");
            return Err(PurbError::NoMatchingEntrypoint);
        },
    };
    let shared_secret = Zeroizing::new(derive(KdfPurpose::SharedSecret, &dh));
    let entry_key = Zeroizing::new(derive(KdfPurpose::EntrypointKey, &shared_secret[..]));

    let entry_len = info.entrypoint_length;
    let limit = data.len().min(config.max_header_length);
    let probes = ProbeSequence::new(&shared_secret[..], info.table_anchor(), entry_len, config);

    for probe in probes {
        if !probe.table_fits(entry_len, limit) {
            break;
        }
        if !probe.slot_fits(entry_len, limit) {
            continue;
        }

        let candidate = &data[probe.offset..probe.offset + entry_len];
        match open(&entry_key, &nonce, candidate) {
            Ok(plaintext) => {
                debug!(%suite_id, offset = probe.offset, "entrypoint found");
                let content = EntrypointContent::from_bytes(&Zeroizing::new(plaintext))?;
                return finish(data, tag, &nonce, &content);
            },
            Err(CryptoError::DecryptionFailed { .. }) => {
                trace!(%suite_id, offset = probe.offset, "not this slot");
            },
            Err(err) => return Err(err.into()),
        }
    }

    debug!(%suite_id, "no entrypoint opened");
    Err(PurbError::NoMatchingEntrypoint)
}

/// Verify the tag, then decrypt and unpad the payload.
fn finish(
    data: &[u8],
    tag: &[u8],
    nonce: &[u8; NONCE_LENGTH],
    content: &EntrypointContent,
) -> Result<Vec<u8>, PurbError> {
    let mac_key = Zeroizing::new(derive(KdfPurpose::MacKey, &content.session_key));
    if !verify_tag(&mac_key[..], data, tag) {
        warn!("entrypoint opened but blob tag does not verify");
        return Err(PurbError::TagMismatch);
    }

    let start = content.payload_start as usize;
    let end = content.payload_end as usize;
    if start < NONCE_LENGTH || start > end || end > data.len() {
        return Err(PurbError::MalformedPayload {
            reason: format!("payload bounds [{start}, {end}) outside blob of {}", data.len()),
        });
    }

    let mut payload = data[start..end].to_vec();
    let payload_key = Zeroizing::new(derive(KdfPurpose::PayloadKey, &content.session_key));
    apply_keystream(&payload_key, nonce, &mut payload);

    let len = unpad(&payload)?.len();
    payload.truncate(len);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use purb_crypto::X25519Suite;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{
        config::{ENTRYPOINT_LENGTH, SuiteId, SuiteInfoMap},
        encode::encode,
    };

    fn setup(seed: u64) -> (PurbConfig, Recipient, ChaCha20Rng) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let config =
            PurbConfig::new(SuiteInfoMap::staggered(&[SuiteId(0)], 32, ENTRYPOINT_LENGTH));
        let recipient = Recipient::generate(SuiteId(0), Arc::new(X25519Suite), &mut rng);
        (config, recipient, rng)
    }

    #[test]
    fn short_blob_is_a_miss() {
        let (config, recipient, _) = setup(1);

        for len in [0, 1, NONCE_LENGTH, NONCE_LENGTH + MAC_LENGTH - 1] {
            let err = decode(&vec![0u8; len], &recipient, &config).unwrap_err();
            assert!(err.is_decode_miss(), "length {len}: {err}");
        }
    }

    #[test]
    fn random_bytes_are_a_miss() {
        let (config, recipient, mut rng) = setup(2);
        let mut blob = vec![0u8; 256];
        rand::RngCore::fill_bytes(&mut rng, &mut blob);

        assert_eq!(decode(&blob, &recipient, &config), Err(PurbError::NoMatchingEntrypoint));
    }

    #[test]
    fn public_only_recipient_cannot_decode() {
        let (config, recipient, mut rng) = setup(3);
        let purb = encode(b"hello", &[recipient.public_only()], &config, &mut rng).unwrap();

        let err = decode(purb.as_bytes(), &recipient.public_only(), &config).unwrap_err();
        assert_eq!(err, PurbError::MissingPrivateKey);
    }

    #[test]
    fn unknown_suite_is_config_error() {
        let (config, recipient, mut rng) = setup(4);
        let purb = encode(b"hello", &[recipient.clone()], &config, &mut rng).unwrap();

        let stranger = Recipient { suite_id: SuiteId(9), ..recipient };
        let err = decode(purb.as_bytes(), &stranger, &config).unwrap_err();

        assert!(err.is_config_error());
    }

    #[test]
    fn recovered_cornerstone_matches_encoded() {
        let (config, recipient, mut rng) = setup(5);
        let purb = encode(b"hello", &[recipient], &config, &mut rng).unwrap();

        let blob = purb.as_bytes();
        let data = &blob[..blob.len() - MAC_LENGTH];
        let info = config.suites.get(SuiteId(0)).unwrap();
        let cornerstone = &purb.header().cornerstones()[&SuiteId(0)];

        assert_eq!(recover_cornerstone(data, info), cornerstone.encoded);
    }
}
