//! Artifact references.

use std::path::{Path, PathBuf};

use diagen_diagrams::Fingerprint;
use serde::Serialize;

/// A rendered artifact's identity and location.
///
/// The file name is `{doc_base_name}-{fingerprint}.{ext}`. This name is
/// referenced by the site templates, so it must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArtifactRef {
    /// Where the artifact lives on disk.
    pub output_path: PathBuf,
    /// Content fingerprint embedded in the file name.
    pub fingerprint: Fingerprint,
}

impl ArtifactRef {
    /// File name of the artifact (`guide-299af3f1.svg`).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.output_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Public URL path under `prefix` (`/diagrams/guide-299af3f1.svg`).
    ///
    /// Leading and trailing slashes on `prefix` are normalized.
    #[must_use]
    pub fn published_path(&self, prefix: &str) -> String {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("/{}", self.file_name())
        } else {
            format!("/{prefix}/{}", self.file_name())
        }
    }

    /// Whether the artifact file is present.
    ///
    /// Presence is all that is checked: a truncated file left by a crashed
    /// run counts as present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.output_path.is_file()
    }

    /// Directory the artifact is published into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.output_path.parent().unwrap_or(Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ref(path: &str) -> ArtifactRef {
        ArtifactRef {
            output_path: PathBuf::from(path),
            fingerprint: Fingerprint::of("A -> B"),
        }
    }

    #[test]
    fn test_file_name() {
        let r = make_ref("static/diagrams/guide-299af3f1.svg");
        assert_eq!(r.file_name(), "guide-299af3f1.svg");
    }

    #[test]
    fn test_published_path_prefix_normalized() {
        let r = make_ref("static/diagrams/guide-299af3f1.svg");
        assert_eq!(r.published_path("/diagrams"), "/diagrams/guide-299af3f1.svg");
        assert_eq!(r.published_path("diagrams/"), "/diagrams/guide-299af3f1.svg");
        assert_eq!(
            r.published_path("/assets/diagrams/"),
            "/assets/diagrams/guide-299af3f1.svg"
        );
        assert_eq!(r.published_path(""), "/guide-299af3f1.svg");
        assert_eq!(r.published_path("/"), "/guide-299af3f1.svg");
    }

    #[test]
    fn test_dir() {
        let r = make_ref("static/diagrams/guide-299af3f1.svg");
        assert_eq!(r.dir(), Path::new("static/diagrams"));
    }

    #[test]
    fn test_exists_false_for_missing_file() {
        let r = make_ref("/definitely/not/here/guide-299af3f1.svg");
        assert!(!r.exists());
    }
}
