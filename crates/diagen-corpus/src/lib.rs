//! Document corpus for diagen.
//!
//! Walks a source directory for text documents and loads them as
//! [`Document`]s. The pipeline only needs `(path, text)` pairs, so anything
//! that can produce documents can stand in for [`Corpus`].
//!
//! # Example
//!
//! ```ignore
//! use diagen_corpus::Corpus;
//!
//! let corpus = Corpus::new("content", "md");
//! for doc in corpus.load()? {
//!     println!("{}: {} bytes", doc.path.display(), doc.text.len());
//! }
//! ```

mod scanner;

use std::fs;
use std::path::{Path, PathBuf};

use scanner::Scanner;

/// A source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path of the document file.
    pub path: PathBuf,
    /// Full text content.
    pub text: String,
}

impl Document {
    /// Create a document from a path and its text.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// File name without its extension (`content/guide.md` -> `guide`).
    ///
    /// Artifacts are named after this, so documents with the same base name
    /// in different directories share artifacts for identical content.
    #[must_use]
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Corpus error.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// The source directory does not exist.
    #[error("source directory not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The source path exists but is not a directory.
    #[error("source path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// A directory tree of documents with one file extension.
#[derive(Debug, Clone)]
pub struct Corpus {
    source_dir: PathBuf,
    extension: String,
}

impl Corpus {
    /// Create a corpus over `source_dir` for files ending in `.{extension}`.
    pub fn new(source_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            source_dir: source_dir.into(),
            extension: extension.trim_start_matches('.').to_owned(),
        }
    }

    /// Root directory of the corpus.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Paths of all documents, sorted.
    pub fn scan(&self) -> Result<Vec<PathBuf>, CorpusError> {
        if !self.source_dir.exists() {
            return Err(CorpusError::NotFound(self.source_dir.clone()));
        }
        if !self.source_dir.is_dir() {
            return Err(CorpusError::NotADirectory(self.source_dir.clone()));
        }
        let paths = Scanner::new(self.source_dir.clone(), self.extension.clone()).scan();
        tracing::debug!(
            source_dir = %self.source_dir.display(),
            document_count = paths.len(),
            "Corpus scan completed"
        );
        Ok(paths)
    }

    /// Read all documents.
    ///
    /// Files that cannot be read as UTF-8 text are logged and skipped.
    pub fn load(&self) -> Result<Vec<Document>, CorpusError> {
        let documents = self
            .scan()?
            .into_iter()
            .filter_map(|path| match fs::read_to_string(&path) {
                Ok(text) => Some(Document { path, text }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read document");
                    None
                }
            })
            .collect();
        Ok(documents)
    }
}
