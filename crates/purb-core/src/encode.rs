//! PURB encoding.
//!
//! Blob layout:
//!
//! ```text
//! [0 .. 12)                      nonce
//! [primary slots]                hidden ephemeral public keys, XOR-patched
//! [hash-table slots]             AEAD(session_key ‖ start ‖ end)
//! [unreserved header bytes]      random filler
//! [header_len .. end - 32)       ChaCha20(data ‖ 0x80 ‖ 0x00…)
//! [end - 32 .. end)              HMAC-SHA256 over everything before it
//! ```

use purb_crypto::{KdfPurpose, apply_keystream, compute_tag, derive, seal};
use rand::{CryptoRng, RngCore};
use tracing::debug;
use zeroize::Zeroizing;

use crate::{
    config::{MAC_LENGTH, NONCE_LENGTH, PurbConfig, SESSION_KEY_LENGTH, SuiteInfoMap},
    error::PurbError,
    header::{Header, cornerstone::fold_positions, entrypoint::EntrypointContent},
    padding::{pad_to, padded_length},
    purb::Purb,
    recipient::Recipient,
};

/// Encode `data` for every recipient in `recipients`.
///
/// # Errors
///
/// - `InvalidConfig`, `InvalidSuiteInfo`: if `config` fails validation.
/// - `NoRecipients`: if `recipients` is empty.
/// - `MissingSuiteInfo`, `CornerstoneLengthMismatch`, `UnhideableKeypair`:
///   if a recipient's suite does not match the configuration.
/// - `UnsatisfiableCornerstonePlacement`: if the suites in use cannot all be
///   given a primary slot.
/// - `EntrypointTableOverflow`: if the header would exceed its maximum
///   length.
/// - `PayloadTooLarge`: if the payload end does not fit a 32-bit offset.
pub fn encode<R: RngCore + CryptoRng>(
    data: &[u8],
    recipients: &[Recipient],
    config: &PurbConfig,
    rng: &mut R,
) -> Result<Purb, PurbError> {
    config.validate()?;
    if recipients.is_empty() {
        return Err(PurbError::NoRecipients);
    }

    let mut nonce = [0u8; NONCE_LENGTH];
    rng.fill_bytes(&mut nonce);
    let mut session_key = Zeroizing::new([0u8; SESSION_KEY_LENGTH]);
    rng.fill_bytes(&mut session_key[..]);

    let mut header = Header::build(recipients, config, rng)?;
    header.place(config)?;
    let header_len = header.length();

    let mut in_use = SuiteInfoMap::new();
    for &suite in header.cornerstones().keys() {
        in_use.insert(suite, config.suites.require(suite)?.clone());
    }

    let total = blob_length(data.len(), header_len, &in_use);
    let data_len = total - MAC_LENGTH;
    let payload_len = data_len - header_len;
    if payload_len == 0 {
        return Err(PurbError::PayloadSizeZero);
    }

    let offset = |value: usize| {
        u32::try_from(value).map_err(|_| PurbError::PayloadTooLarge { length: data_len })
    };
    let content = EntrypointContent {
        session_key: *session_key,
        payload_start: offset(header_len)?,
        payload_end: offset(data_len)?,
    };

    let mut payload = pad_to(data, payload_len);
    let payload_key = Zeroizing::new(derive(KdfPurpose::PayloadKey, &session_key[..]));
    apply_keystream(&payload_key, &nonce, &mut payload);

    let mut blob = vec![0u8; data_len];
    blob[..NONCE_LENGTH].copy_from_slice(&nonce);
    write_cornerstones(&mut blob, &header);
    write_entrypoints(&mut blob, &header, &content, &nonce)?;
    header.layout().scan_free(header_len, |start, end| rng.fill_bytes(&mut blob[start..end]));
    blob[header_len..].copy_from_slice(&payload);
    patch_cornerstones(&mut blob, &header, &in_use);

    let mac_key = Zeroizing::new(derive(KdfPurpose::MacKey, &session_key[..]));
    let tag = compute_tag(&mac_key[..], &blob);
    blob.extend_from_slice(&tag);

    debug!(
        recipients = recipients.len(),
        suites = in_use.len(),
        header_len,
        payload_len,
        total = blob.len(),
        "purb encoded"
    );

    Ok(Purb { nonce, header, payload, session_key, suites: in_use, blob })
}

/// Final blob length for a payload of `data_len` bytes.
///
/// Starts from the Padmé length of `data ‖ sentinel ‖ header ‖ tag`. While
/// the tag would cover an allowed position of a suite in use, moves to the
/// next Padmé length: a tag over a position would corrupt the XOR fold.
pub fn blob_length(data_len: usize, header_len: usize, in_use: &SuiteInfoMap) -> usize {
    let overhead = header_len + MAC_LENGTH;
    let mut total = padded_length(data_len + 1 + overhead);

    while tag_overlaps(total, in_use) {
        debug!(total, "tag overlaps a cornerstone position, re-padding");
        total = padded_length(total + 1);
    }

    total
}

fn tag_overlaps(total: usize, in_use: &SuiteInfoMap) -> bool {
    in_use.iter().any(|(_, info)| info.overlaps_positions(total - MAC_LENGTH, total))
}

fn write_cornerstones(blob: &mut [u8], header: &Header) {
    for cornerstone in header.cornerstones().values() {
        if let Some(offset) = cornerstone.offset {
            blob[offset..offset + cornerstone.encoded.len()].copy_from_slice(&cornerstone.encoded);
        }
    }
}

fn write_entrypoints(
    blob: &mut [u8],
    header: &Header,
    content: &EntrypointContent,
    nonce: &[u8; NONCE_LENGTH],
) -> Result<(), PurbError> {
    let plaintext = Zeroizing::new(content.to_bytes());

    for entrypoint in header.entrypoints().values().flatten() {
        let Some(offset) = entrypoint.offset else {
            continue;
        };

        let key = Zeroizing::new(derive(KdfPurpose::EntrypointKey, &entrypoint.shared_secret[..]));
        let sealed = seal(&key, nonce, &plaintext[..]);
        if sealed.len() != entrypoint.length {
            return Err(PurbError::EntrypointLengthMismatch {
                suite: entrypoint.suite_id,
                expected: entrypoint.length,
                actual: sealed.len(),
            });
        }

        blob[offset..offset + entrypoint.length].copy_from_slice(&sealed);
    }

    Ok(())
}

/// Rewrite each primary slot so the XOR of all allowed positions yields the
/// hidden key.
///
/// Runs in placement order. A later suite's positions may cover an earlier
/// suite's primary slot, never the reverse, so each fold reads final bytes.
fn patch_cornerstones(blob: &mut [u8], header: &Header, in_use: &SuiteInfoMap) {
    for &suite in header.placement_order() {
        let (Some(cornerstone), Some(info)) =
            (header.cornerstones().get(&suite), in_use.get(suite))
        else {
            continue;
        };
        let Some(primary) = cornerstone.offset else {
            continue;
        };

        let others = fold_positions(blob, info, Some(primary));
        xor_into(&mut blob[primary..primary + info.cornerstone_length], &others);
    }
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
