//! Shared constants for diagram blocks.

/// Default shortcode marker name (`{{< plantuml >}}`).
pub const DEFAULT_MARKER: &str = "plantuml";

/// Default fence language stripped from block content (`` ```plantuml ``).
pub const DEFAULT_LANGUAGE: &str = "plantuml";

/// Default fingerprint length in hex characters (32 bits).
pub const DEFAULT_FINGERPRINT_LEN: usize = 8;

/// Shortest fingerprint accepted.
pub const MIN_FINGERPRINT_LEN: usize = 4;

/// Longest fingerprint accepted (a full hex-encoded SHA-256 digest).
pub const MAX_FINGERPRINT_LEN: usize = 64;
