//! Document discovery by filesystem walking.
//!
//! The Scanner only finds files; reading them is left to
//! [`Corpus::load`](crate::Corpus::load).

use std::fs;
use std::path::{Path, PathBuf};

/// Walks a directory tree for files with one extension.
pub(crate) struct Scanner {
    source_dir: PathBuf,
    extension: String,
}

impl Scanner {
    /// Create a new Scanner.
    ///
    /// # Arguments
    ///
    /// * `source_dir` - Root directory to scan
    /// * `extension` - File extension to collect, without the dot (e.g., "md")
    pub fn new(source_dir: PathBuf, extension: String) -> Self {
        Self {
            source_dir,
            extension,
        }
    }

    /// Scan the tree and return matching file paths in sorted order.
    ///
    /// Returns an empty Vec if the source directory doesn't exist.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if self.source_dir.exists() {
            self.scan_directory(&self.source_dir, &mut paths);
        }
        paths.sort();
        paths
    }

    fn scan_directory(&self, dir_path: &Path, paths: &mut Vec<PathBuf>) {
        let Ok(entries) = fs::read_dir(dir_path) else {
            tracing::warn!(dir = %dir_path.display(), "Failed to read directory");
            return;
        };

        for entry in entries.filter_map(Result::ok) {
            // Skip hidden files/dirs
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let path = entry.path();
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());

            if is_dir {
                self.scan_directory(&path, paths);
            } else if path.extension().is_some_and(|e| e == self.extension.as_str()) {
                paths.push(path);
            }
        }
    }
}
