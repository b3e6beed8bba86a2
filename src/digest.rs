//! One-way digests for secrets
//!
//! Every password goes through a [`Digest`] before it reaches the store.

use sha2::{Digest as _, Sha256};

/// `cleartext -> opaque digest`, one-way.
pub trait Digest: Send + Sync + 'static {
    fn digest(&self, cleartext: &str) -> String;

    /// Whether `cleartext` produces `digest`.
    fn matches(&self, cleartext: &str, digest: &str) -> bool {
        self.digest(cleartext) == digest
    }
}

/// Salted SHA-256, hex encoded.
#[derive(Debug, Clone)]
pub struct Sha256Digest {
    salt: String,
}

impl Sha256Digest {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// A fresh salt per process; digests do not survive a restart.
    pub fn with_random_salt() -> Self {
        Self::new(uuid::Uuid::now_v7().simple().to_string())
    }
}

impl Digest for Sha256Digest {
    fn digest(&self, cleartext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(b":");
        hasher.update(cleartext.as_bytes());
        hex::encode(hasher.finalize())
    }
}
