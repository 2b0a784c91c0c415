//! Property-based tests for Padmé padding
//!
//! 1. **Round-trip**: unpad(pad(m, k)) == m
//! 2. **Bucketing**: the padded length depends only on `len(m) + k`
//! 3. **Bounded overhead**: padding adds less than 1/16 from 256 bytes up

use proptest::prelude::*;
use purb_core::{pad, pad_to, padded_length, unpad};

#[test]
fn known_values() {
    let cases = [
        (0, 0),
        (1, 1),
        (2, 2),
        (3, 3),
        (4, 4),
        (8, 8),
        (9, 10),
        (100, 104),
        (193, 208),
        (209, 224),
        (1000, 1024),
        (1025, 1088),
    ];

    for (len, expected) in cases {
        assert_eq!(padded_length(len), expected, "length {len}");
    }
}

#[test]
fn bucket_count_grows_logarithmically() {
    // Between 2^e and 2^(e+1) there are 2^(floor(log2 e) + 1) buckets.
    for e in 3u32..16 {
        let lo = 1usize << e;
        let mut buckets: Vec<usize> =
            (lo..2 * lo).map(padded_length).filter(|&p| p < 2 * lo).collect();
        buckets.dedup();

        assert_eq!(buckets.len(), 1 << (e.ilog2() + 1), "e = {e}");
    }
}

#[test]
fn pad_to_never_truncates() {
    let padded = pad_to(b"abcdef", 3);
    assert_eq!(padded, b"abcdef\x80");
    assert_eq!(unpad(&padded).unwrap(), b"abcdef");
}

#[test]
fn unpad_rejects_missing_sentinel() {
    assert!(unpad(&[]).is_err());
    assert!(unpad(&[0, 0, 0]).is_err());
    assert!(unpad(b"data\x01\x00").is_err());
}

proptest! {
    #[test]
    fn prop_pad_unpad_roundtrip(
        data in prop::collection::vec(any::<u8>(), 0..4096),
        overhead in 0usize..512,
    ) {
        let padded = pad(&data, overhead);

        prop_assert_eq!(padded_length(padded.len() + overhead), padded.len() + overhead);
        prop_assert_eq!(unpad(&padded).unwrap(), data.as_slice());
    }

    #[test]
    fn prop_length_depends_only_on_total(
        a in 0usize..4096,
        overhead_a in 0usize..512,
        overhead_b in 0usize..512,
    ) {
        let total = a + overhead_a;
        prop_assume!(total >= overhead_b);
        let b = total - overhead_b;

        let padded_a = pad(&vec![1u8; a], overhead_a);
        let padded_b = pad(&vec![2u8; b], overhead_b);

        prop_assert_eq!(padded_a.len() + overhead_a, padded_b.len() + overhead_b);
    }

    #[test]
    fn prop_padded_length_is_minimal_fixed_point(len in 2usize..1_000_000) {
        let padded = padded_length(len);

        prop_assert!(padded >= len);
        prop_assert_eq!(padded_length(padded), padded);
        prop_assert!(padded_length(len - 1) <= padded);
    }

    #[test]
    fn prop_overhead_is_bounded(len in 256usize..1_000_000) {
        let padded = padded_length(len);
        prop_assert!((padded - len) * 16 < len, "{len} -> {padded}");
    }
}
