//! Message destinations.

use std::{fmt, sync::Arc};

use purb_crypto::{KeyPair, Suite};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::config::SuiteId;

/// One destination of a PURB.
///
/// Encoding needs only the public key. Decoding also needs the private key,
/// which is zeroized on drop.
#[derive(Clone)]
pub struct Recipient {
    /// Configured suite this recipient's key belongs to
    pub suite_id: SuiteId,
    /// Suite implementation
    pub suite: Arc<dyn Suite>,
    /// Marshaled static public key
    pub public_key: Vec<u8>,
    /// Marshaled static private key, absent when only encoding
    pub private_key: Option<Zeroizing<Vec<u8>>>,
}

impl Recipient {
    /// Recipient usable for encoding only.
    pub fn new(suite_id: SuiteId, suite: Arc<dyn Suite>, public_key: Vec<u8>) -> Self {
        Self { suite_id, suite, public_key, private_key: None }
    }

    /// Recipient holding a full keypair.
    pub fn from_keypair(suite_id: SuiteId, suite: Arc<dyn Suite>, keypair: KeyPair) -> Self {
        Self {
            suite_id,
            suite,
            public_key: keypair.public,
            private_key: Some(keypair.private),
        }
    }

    /// Generate a fresh static keypair.
    pub fn generate<R: RngCore + CryptoRng>(
        suite_id: SuiteId,
        suite: Arc<dyn Suite>,
        rng: &mut R,
    ) -> Self {
        let keypair = suite.generate_keypair(rng);
        Self::from_keypair(suite_id, suite, keypair)
    }

    /// Copy without the private key.
    #[must_use]
    pub fn public_only(&self) -> Self {
        Self::new(self.suite_id, Arc::clone(&self.suite), self.public_key.clone())
    }
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipient")
            .field("suite_id", &self.suite_id)
            .field("suite", &self.suite.name())
            .field("public_key_len", &self.public_key.len())
            .field("has_private_key", &self.private_key.is_some())
            .finish()
    }
}
