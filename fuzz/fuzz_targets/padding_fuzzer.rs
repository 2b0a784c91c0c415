//! Fuzz target for Padmé padding
//!
//! # Invariants
//!
//! - `unpad(pad(m, k)) == m`
//! - `len(pad(m, k)) + k` is a Padmé length and never below `len(m) + 1 + k`
//! - `unpad` on arbitrary bytes MUST NOT panic and, on success, returns a
//!   prefix followed by the sentinel

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use purb_core::{pad, padded_length, unpad};

#[derive(Debug, Clone, Arbitrary)]
struct Case {
    data: Vec<u8>,
    overhead: u16,
    raw: Vec<u8>,
}

fuzz_target!(|case: Case| {
    let overhead = usize::from(case.overhead);
    let padded = pad(&case.data, overhead);
    let total = padded.len() + overhead;

    assert_eq!(padded_length(total), total);
    assert!(total > case.data.len() + overhead);
    assert_eq!(unpad(&padded).ok(), Some(case.data.as_slice()));

    if let Ok(prefix) = unpad(&case.raw) {
        assert_eq!(case.raw.get(prefix.len()), Some(&0x80));
        assert!(case.raw[prefix.len() + 1..].iter().all(|&b| b == 0));
    }
});
