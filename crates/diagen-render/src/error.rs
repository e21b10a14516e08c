//! Render error types.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use diagen_diagrams::Fingerprint;

/// Renderer is not usable; the run must not start.
#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    /// Renderer program is not on `PATH` and is not an existing file.
    #[error("renderer program '{program}' not found: {source}")]
    ProgramNotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    /// Configured jar file is missing.
    #[error("renderer jar not found: {}", .0.display())]
    JarNotFound(PathBuf),
}

/// Failure of a single renderer process run.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// Process could not be started.
    #[error("failed to start renderer: {0}")]
    Spawn(#[source] io::Error),
    /// Waiting on the process failed.
    #[error("failed to wait for renderer: {0}")]
    Wait(#[source] io::Error),
    /// Process exited unsuccessfully.
    #[error("renderer exited with {}{}", exit_label(.code.as_ref()), stderr_suffix(.stderr))]
    Exit {
        /// Exit code, `None` if killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// Process ran longer than the configured timeout and was killed.
    #[error("renderer timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    /// Renderer-specific failure (used by in-process renderers).
    #[error("{0}")]
    Other(String),
}

fn exit_label(code: Option<&i32>) -> String {
    code.map_or_else(|| "signal".to_owned(), |c| format!("code {c}"))
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Step of the render sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStep {
    /// Preparing the scratch directory.
    Scratch,
    /// Writing the renderer input file.
    Input,
    /// Running the renderer.
    Invoke,
    /// Finding the renderer's output file.
    Discover,
    /// Moving the output to its artifact path.
    Publish,
}

impl fmt::Display for RenderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scratch => "scratch",
            Self::Input => "input",
            Self::Invoke => "invoke",
            Self::Discover => "discover",
            Self::Publish => "publish",
        })
    }
}

/// Kind of render error.
#[derive(Debug, thiserror::Error)]
pub enum RenderErrorKind {
    #[error("failed to prepare scratch directory: {0}")]
    Scratch(#[source] io::Error),
    #[error("failed to write renderer input: {0}")]
    Input(#[source] io::Error),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    #[error("failed to list renderer output: {0}")]
    Discover(#[source] io::Error),
    #[error("renderer produced no .{0} file")]
    NoOutput(String),
    #[error("renderer produced {} files, expected one: {}", .0.len(), .0.join(", "))]
    MultipleOutputs(Vec<String>),
    #[error("failed to publish artifact: {0}")]
    Publish(#[source] io::Error),
}

impl RenderErrorKind {
    /// The step this error belongs to.
    #[must_use]
    pub fn step(&self) -> RenderStep {
        match self {
            Self::Scratch(_) => RenderStep::Scratch,
            Self::Input(_) => RenderStep::Input,
            Self::Invoke(_) => RenderStep::Invoke,
            Self::Discover(_) | Self::NoOutput(_) | Self::MultipleOutputs(_) => {
                RenderStep::Discover
            }
            Self::Publish(_) => RenderStep::Publish,
        }
    }
}

/// Rendering one diagram failed.
///
/// Carries the scratch directory, which is left on disk for inspection.
#[derive(Debug, thiserror::Error)]
#[error("diagram {fingerprint} ({}): {kind}", .kind.step())]
pub struct RenderError {
    pub fingerprint: Fingerprint,
    pub kind: RenderErrorKind,
    pub scratch: Option<PathBuf>,
}

impl RenderError {
    /// The step that failed.
    #[must_use]
    pub fn step(&self) -> RenderStep {
        self.kind.step()
    }
}
