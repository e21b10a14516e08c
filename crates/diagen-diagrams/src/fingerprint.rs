//! Content fingerprints used as artifact cache keys.
//!
//! Provides [`Fingerprint`], a truncated hex-encoded SHA-256 digest of
//! canonical block content.
//!
//! # Collisions
//!
//! The default length of 8 hex characters keeps only 32 bits of the digest.
//! With `n` distinct diagrams the chance of any collision is roughly
//! `n^2 / 2^33`: about 0.01% at 1000 diagrams, 1% near 9300. A collision is a
//! false cache hit (the wrong picture is served), never data loss. Corpora
//! that grow past a few thousand diagrams should raise `fingerprint_len`.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical::canonicalize;
use crate::consts::{DEFAULT_FINGERPRINT_LEN, MAX_FINGERPRINT_LEN, MIN_FINGERPRINT_LEN};

/// Short, deterministic identifier of canonical diagram content.
///
/// Equal canonical content always yields equal fingerprints, across runs and
/// machines. There is no salt and no time component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint canonical content with the default length.
    #[must_use]
    pub fn of(canonical: &str) -> Self {
        Self::with_len(canonical, DEFAULT_FINGERPRINT_LEN)
    }

    /// Fingerprint canonical content, keeping `len` hex characters.
    ///
    /// `len` is clamped to `4..=64`.
    ///
    /// # Hash Format
    ///
    /// First `len` characters of `hex(sha256(canonical))`.
    #[must_use]
    pub fn with_len(canonical: &str, len: usize) -> Self {
        let len = len.clamp(MIN_FINGERPRINT_LEN, MAX_FINGERPRINT_LEN);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(len);
        Self(digest)
    }

    /// Canonicalize raw block content, then fingerprint it.
    #[must_use]
    pub fn of_raw(raw: &str, len: usize) -> Self {
        Self::with_len(canonicalize(raw), len)
    }

    /// The hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
