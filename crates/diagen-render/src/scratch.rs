//! Per-render scratch directories.
//!
//! Each render gets a private directory so that "whatever appeared in the
//! output directory" can be attributed to that render alone:
//!
//! ```text
//! {scratch_root}/
//! +-- 299af3f1-4242-0/      # {fingerprint}-{pid}-{seq}
//!     +-- 299af3f1.puml     # renderer input
//!     +-- out/              # renderer output directory
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use diagen_diagrams::Fingerprint;

use crate::consts::SCRATCH_OUTPUT_DIR;

static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// A private working area for one render.
#[derive(Debug)]
pub(crate) struct Scratch {
    dir: PathBuf,
    input: PathBuf,
    output_dir: PathBuf,
}

impl Scratch {
    /// Create an empty scratch directory under `root`.
    ///
    /// The name combines the fingerprint, the process id and a process-wide
    /// sequence number, so concurrent renders never share a directory, even
    /// for the same fingerprint. A leftover with the same name (kept by an
    /// earlier failed run whose pid was reused) is never touched; the next
    /// free sequence number is used instead.
    pub(crate) fn prepare(
        root: &Path,
        fingerprint: &Fingerprint,
        input_extension: &str,
    ) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let pid = std::process::id();
        let dir = loop {
            let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
            let candidate = root.join(format!("{fingerprint}-{pid}-{seq}"));
            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!(dir = %candidate.display(), "scratch directory taken, trying next");
                }
                Err(e) => return Err(e),
            }
        };
        let output_dir = dir.join(SCRATCH_OUTPUT_DIR);
        fs::create_dir(&output_dir)?;

        Ok(Self {
            input: dir.join(format!("{fingerprint}.{input_extension}")),
            dir,
            output_dir,
        })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn input(&self) -> &Path {
        &self.input
    }

    pub(crate) fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Files in the output directory with `extension`, sorted by name.
    pub(crate) fn outputs(&self, extension: &str) -> io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.output_dir)?
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == extension))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Remove the scratch directory and everything in it.
    pub(crate) fn remove(self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "failed to remove scratch directory");
        }
    }
}
