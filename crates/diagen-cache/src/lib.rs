//! Content-addressed artifact cache for diagen.
//!
//! The output directory itself is the cache index: an artifact named
//! `{doc_base_name}-{fingerprint}.{ext}` being present means the diagram has
//! been rendered. There is no separate metadata store, which also means stale
//! or corrupt entries cannot be detected. Artifacts are never overwritten or
//! deleted here.
//!
//! # Example
//!
//! ```
//! use diagen_cache::ArtifactCache;
//! use diagen_diagrams::Fingerprint;
//!
//! let cache = ArtifactCache::new("static/diagrams", "svg");
//! let artifact = cache.resolve("guide", &Fingerprint::of("A -> B"));
//! assert_eq!(artifact.file_name(), "guide-299af3f1.svg");
//! assert_eq!(artifact.published_path("/diagrams"), "/diagrams/guide-299af3f1.svg");
//! ```

mod artifact;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use diagen_diagrams::Fingerprint;

pub use artifact::ArtifactRef;

/// Artifact cache rooted at a publish directory.
///
/// Directory layout:
/// ```text
/// {output_dir}/
/// +-- guide-299af3f1.svg
/// +-- guide-46dca6d8.svg
/// +-- setup-299af3f1.svg
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    output_dir: PathBuf,
    extension: String,
}

impl ArtifactCache {
    /// Create a cache for artifacts with `extension` in `output_dir`.
    ///
    /// No I/O happens here; call [`ensure_dir`](Self::ensure_dir) before
    /// publishing.
    pub fn new(output_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            output_dir: output_dir.into(),
            extension: extension.trim_start_matches('.').to_owned(),
        }
    }

    /// Directory artifacts are published into.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Artifact file extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Compute the artifact reference for a document base name and fingerprint.
    ///
    /// Pure path arithmetic; the filesystem is not consulted.
    #[must_use]
    pub fn resolve(&self, doc_base_name: &str, fingerprint: &Fingerprint) -> ArtifactRef {
        let file_name = format!("{doc_base_name}-{fingerprint}.{}", self.extension);
        ArtifactRef {
            output_path: self.output_dir.join(file_name),
            fingerprint: fingerprint.clone(),
        }
    }

    /// Whether `artifact` is already present (cache hit).
    #[must_use]
    pub fn exists(&self, artifact: &ArtifactRef) -> bool {
        let hit = artifact.exists();
        tracing::trace!(path = %artifact.output_path.display(), hit, "artifact lookup");
        hit
    }

    /// Create the output directory if it does not exist.
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.output_dir)
    }
}
