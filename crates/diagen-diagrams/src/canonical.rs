//! Canonical form of block content.
//!
//! The canonical form is the hashing input for [`Fingerprint`](crate::Fingerprint).
//! Site templates hash the same trimmed text to find the rendered artifact, so
//! the transformation must stay exactly "trim surrounding whitespace".

/// Canonicalize raw block content by trimming leading and trailing whitespace.
///
/// Internal lines are never touched. The function is total and idempotent.
#[must_use]
pub fn canonicalize(raw: &str) -> &str {
    raw.trim()
}
