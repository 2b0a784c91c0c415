//! Padmé length padding.
//!
//! A length `L` with `E = floor(log2 L)` is rounded up so its low
//! `E - (floor(log2 E) + 1)` bits are zero. The number of distinct padded
//! lengths below `2^E` grows only logarithmically, so a padded length leaks
//! `O(log log L)` bits while overhead stays under `1 / 2^(floor(log2 E) + 1)`.
//!
//! Framing is `data ‖ 0x80 ‖ 0x00…`: the last non-zero byte marks the end of
//! the data, so decoding never needs a length field.

use crate::error::PurbError;

/// Byte separating data from zero fill
pub const PADDING_SENTINEL: u8 = 0x80;

/// Smallest Padmé length not below `len`.
///
/// Lengths 0 and 1 are returned unchanged. `len` must stay well below
/// `usize::MAX`.
pub fn padded_length(len: usize) -> usize {
    if len < 2 {
        return len;
    }

    let e = len.ilog2();
    let s = e.ilog2() + 1;
    let mask = (1usize << (e - s)) - 1;

    (len + mask) & !mask
}

/// Frame `data` so that `result.len() + overhead` is a Padmé length.
pub fn pad(data: &[u8], overhead: usize) -> Vec<u8> {
    let total = padded_length(data.len() + 1 + overhead);
    pad_to(data, total - overhead)
}

/// Frame `data` to exactly `target_len` bytes.
///
/// Never truncates: the result is at least `data.len() + 1` bytes.
pub fn pad_to(data: &[u8], target_len: usize) -> Vec<u8> {
    let len = target_len.max(data.len() + 1);

    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(data);
    out.push(PADDING_SENTINEL);
    out.resize(len, 0);
    out
}

/// Strip the sentinel and zero fill.
///
/// # Errors
///
/// - `MalformedPayload`: if the last non-zero byte is not the sentinel.
pub fn unpad(data: &[u8]) -> Result<&[u8], PurbError> {
    match data.iter().rposition(|&b| b != 0) {
        Some(idx) if data[idx] == PADDING_SENTINEL => Ok(&data[..idx]),
        Some(idx) => Err(PurbError::MalformedPayload {
            reason: format!("expected padding sentinel at {idx}, found {:#04x}", data[idx]),
        }),
        None => Err(PurbError::MalformedPayload { reason: "missing padding sentinel".to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_lengths_are_unchanged() {
        for len in [0, 1, 2, 3, 4, 5, 6, 7, 8] {
            assert_eq!(padded_length(len), len, "length {len}");
        }
    }

    #[test]
    fn first_rounding_at_nine() {
        assert_eq!(padded_length(9), 10);
        assert_eq!(padded_length(10), 10);
        assert_eq!(padded_length(11), 12);
    }

    #[test]
    fn known_padme_values() {
        assert_eq!(padded_length(100), 104);
        assert_eq!(padded_length(193), 208);
        assert_eq!(padded_length(209), 224);
        assert_eq!(padded_length(1000), 1024);
        assert_eq!(padded_length(1024), 1024);
        assert_eq!(padded_length(1025), 1088);
    }

    #[test]
    fn padded_length_is_idempotent() {
        for len in 0..5000 {
            let p = padded_length(len);
            assert!(p >= len);
            assert_eq!(padded_length(p), p, "length {len}");
        }
    }

    #[test]
    fn pad_reaches_padme_length_with_overhead() {
        let data = [7u8; 50];
        let padded = pad(&data, 40);

        let total = padded.len() + 40;
        assert_eq!(total, padded_length(data.len() + 1 + 40));
        assert_eq!(padded[50], PADDING_SENTINEL);
        assert!(padded[51..].iter().all(|&b| b == 0));
    }

    #[test]
    fn pad_empty_data() {
        let padded = pad(&[], 0);
        assert_eq!(padded, vec![PADDING_SENTINEL]);
        assert_eq!(unpad(&padded).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn pad_to_never_truncates() {
        let padded = pad_to(b"abc", 2);
        assert_eq!(padded, b"abc\x80");
    }

    #[test]
    fn unpad_keeps_sentinel_bytes_inside_data() {
        let data = [0x80, 0x00, 0x80, 0x01, 0x00];
        let padded = pad_to(&data, 32);

        assert_eq!(unpad(&padded).unwrap(), &data);
    }

    #[test]
    fn unpad_rejects_missing_sentinel() {
        assert!(matches!(unpad(&[0u8; 16]), Err(PurbError::MalformedPayload { .. })));
        assert!(matches!(unpad(&[]), Err(PurbError::MalformedPayload { .. })));
    }

    #[test]
    fn unpad_rejects_garbage_after_data() {
        assert!(matches!(unpad(&[1, 2, 3, 0, 0]), Err(PurbError::MalformedPayload { .. })));
    }
}
