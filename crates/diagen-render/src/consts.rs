//! Internal constants for renderer invocation.

use std::time::Duration;

/// Default timeout for one renderer invocation (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How often a running renderer is polled for exit.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Subdirectory of a scratch directory that receives renderer output.
pub(crate) const SCRATCH_OUTPUT_DIR: &str = "out";
