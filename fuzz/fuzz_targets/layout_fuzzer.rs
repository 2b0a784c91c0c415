//! Fuzz target for cornerstone and entrypoint placement
//!
//! Builds arbitrary suite tables and recipient sets, then checks the placed
//! header.
//!
//! # Invariants
//!
//! - Placement either succeeds or returns a structured error, never panics
//! - Exclusive regions never overlap
//! - Every placed primary slot is one of its suite's allowed positions
//! - On success every member decodes the blob

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use purb_core::{
    ENTRYPOINT_LENGTH, EntrypointPlacement, PurbConfig, Recipient, SuiteId, SuiteInfo,
    SuiteInfoMap, decode, encode,
};
use purb_crypto::{Suite, X25519Suite};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Debug, Clone, Arbitrary)]
struct Case {
    suites: Vec<Vec<u16>>,
    recipients: Vec<u8>,
    linear: bool,
    attempts: u8,
    max_header: u16,
    seed: u64,
}

fuzz_target!(|case: Case| {
    let mut table = SuiteInfoMap::new();
    for (id, positions) in case.suites.iter().take(6).enumerate() {
        let positions = positions.iter().take(6).map(|&p| usize::from(p)).collect();
        table.insert(SuiteId(id as u16), SuiteInfo::new(positions, 32, ENTRYPOINT_LENGTH));
    }
    if table.is_empty() {
        return;
    }

    let placement =
        if case.linear { EntrypointPlacement::Linear } else { EntrypointPlacement::HashTables };
    let config = PurbConfig::new(table)
        .with_placement(placement)
        .with_linear_attempts(usize::from(case.attempts))
        .with_max_header_length(usize::from(case.max_header));
    if config.validate().is_err() {
        return;
    }

    let mut rng = ChaCha20Rng::seed_from_u64(case.seed);
    let suite: Arc<dyn Suite> = Arc::new(X25519Suite);
    let suite_count = config.suites.len();
    let recipients: Vec<Recipient> = case
        .recipients
        .iter()
        .take(16)
        .map(|&r| {
            let id = SuiteId((usize::from(r) % suite_count) as u16);
            Recipient::generate(id, Arc::clone(&suite), &mut rng)
        })
        .collect();

    let Ok(purb) = encode(b"layout", &recipients, &config, &mut rng) else {
        return;
    };

    let exclusive: Vec<_> =
        purb.header().layout().regions().iter().filter(|r| r.exclusive).collect();
    for (i, a) in exclusive.iter().enumerate() {
        for b in &exclusive[i + 1..] {
            assert!(!a.overlaps(b.start, b.end), "{} overlaps {}", a.label, b.label);
        }
    }

    for (suite, cornerstone) in purb.header().cornerstones() {
        let Some(info) = config.suites.get(*suite) else {
            panic!("placed cornerstone for unknown {suite}");
        };
        let Some(offset) = cornerstone.offset else {
            panic!("{suite} cornerstone left unplaced");
        };
        assert!(info.allowed_positions.contains(&offset));
    }

    for recipient in &recipients {
        assert_eq!(decode(purb.as_bytes(), recipient, &config).as_deref(), Ok(&b"layout"[..]));
    }
});
