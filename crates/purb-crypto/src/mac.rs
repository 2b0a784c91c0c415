//! Blob-wide integrity tag using HMAC-SHA256

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 output size (32 bytes)
pub const MAC_TAG_SIZE: usize = 32;

/// Compute the tag over `data`.
pub fn compute_tag(key: &[u8], data: &[u8]) -> [u8; MAC_TAG_SIZE] {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac.update(data);
    let result = mac.finalize().into_bytes();

    let mut tag = [0u8; MAC_TAG_SIZE];
    tag.copy_from_slice(&result);
    tag
}

/// Verify `tag` over `data` in constant time.
pub fn verify_tag(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}
