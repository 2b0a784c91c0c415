//! Fuzz target for the PURB decoder
//!
//! The decoder reads attacker-controlled bytes: every length, offset and
//! position it derives must be bounds-checked.
//!
//! # Strategy
//!
//! - Raw: arbitrary bytes handed straight to the decoder
//! - Mutated: a valid blob with bytes flipped, truncated or extended
//! - Recipient: a member, an outsider, or a member on the wrong suite
//!
//! # Invariants
//!
//! - Decoding MUST NOT panic on any input
//! - A mutated blob MUST NOT decode
//! - An unmodified blob MUST decode to the original message for a member

#![no_main]

use std::sync::{Arc, OnceLock};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use purb_core::{
    ENTRYPOINT_LENGTH, EntrypointPlacement, PurbConfig, Recipient, SuiteId, SuiteInfoMap,
    decode, encode,
};
use purb_crypto::{Suite, X25519Suite};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const MESSAGE: &[u8] = b"fuzzing the decoder";

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    Raw(Vec<u8>),
    Mutated { mutations: Vec<Mutation>, linear: bool },
}

#[derive(Debug, Clone, Arbitrary)]
enum Mutation {
    Flip { index: u16, mask: u8 },
    Truncate(u16),
    Extend(Vec<u8>),
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Who {
    Member(u8),
    Outsider,
    WrongSuite,
}

#[derive(Debug, Clone, Arbitrary)]
struct Case {
    input: Input,
    who: Who,
}

struct Fixture {
    config: PurbConfig,
    members: Vec<Recipient>,
    outsider: Recipient,
}

fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let ids = [SuiteId(0), SuiteId(1)];
        let config = PurbConfig::new(SuiteInfoMap::staggered(&ids, 32, ENTRYPOINT_LENGTH));
        let suite: Arc<dyn Suite> = Arc::new(X25519Suite);

        let members = (0..4)
            .map(|i| Recipient::generate(ids[i % 2], Arc::clone(&suite), &mut rng))
            .collect();
        let outsider = Recipient::generate(SuiteId(0), suite, &mut rng);

        Fixture { config, members, outsider }
    })
}

fn recipient(fixture: &Fixture, who: Who) -> Recipient {
    match who {
        Who::Member(i) => fixture.members[usize::from(i) % fixture.members.len()].clone(),
        Who::Outsider => fixture.outsider.clone(),
        Who::WrongSuite => {
            let mut r = fixture.members[0].clone();
            r.suite_id = SuiteId(1);
            r
        },
    }
}

fuzz_target!(|case: Case| {
    let fixture = fixture();
    let who = recipient(fixture, case.who);

    match case.input {
        Input::Raw(bytes) => {
            let _ = decode(&bytes, &who, &fixture.config);
        },
        Input::Mutated { mutations, linear } => {
            let placement =
                if linear { EntrypointPlacement::Linear } else { EntrypointPlacement::HashTables };
            let config = fixture.config.clone().with_placement(placement);

            let mut rng = ChaCha20Rng::seed_from_u64(mutations.len() as u64);
            let Ok(purb) = encode(MESSAGE, &fixture.members, &config, &mut rng) else {
                panic!("fixture encode failed");
            };
            let original = purb.into_bytes();

            let mut blob = original.clone();
            for mutation in mutations {
                match mutation {
                    Mutation::Flip { index, mask } => {
                        if !blob.is_empty() {
                            let i = usize::from(index) % blob.len();
                            blob[i] ^= mask;
                        }
                    },
                    Mutation::Truncate(n) => {
                        let n = usize::from(n).min(blob.len());
                        blob.truncate(blob.len() - n);
                    },
                    Mutation::Extend(extra) => blob.extend_from_slice(&extra),
                }
            }

            let result = decode(&blob, &who, &config);
            if blob != original {
                assert!(result.is_err(), "mutated blob decoded");
            } else if let Who::Member(_) = case.who {
                assert_eq!(result.as_deref(), Ok(MESSAGE), "member failed to decode");
            }
        },
    }
});
