//! Run reports.

use std::collections::BTreeMap;
use std::path::PathBuf;

use diagen_cache::ArtifactRef;
use diagen_render::RenderError;
use serde::Serialize;

/// Why a block's artifact was not produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Render step that failed (`invoke`, `discover`, ...).
    pub step: String,
    /// Error message.
    pub message: String,
    /// Scratch directory left behind for inspection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch: Option<PathBuf>,
}

impl From<RenderError> for Failure {
    fn from(err: RenderError) -> Self {
        Self {
            step: err.step().to_string(),
            message: err.kind.to_string(),
            scratch: err.scratch,
        }
    }
}

/// Outcome for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BlockOutcome {
    /// Artifact already existed (or was produced earlier in this run).
    Cached,
    /// Artifact was rendered by this run.
    Generated,
    /// Artifact is missing and rendering was skipped (dry run).
    Pending,
    /// Rendering failed; no artifact.
    Failed(Failure),
}

/// Result for one block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    /// Zero-based position in the document.
    pub ordinal: usize,
    /// Artifact the block maps to.
    pub artifact: ArtifactRef,
    /// Shortcode attributes (`alt`, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    /// What happened.
    #[serde(flatten)]
    pub outcome: BlockOutcome,
}

/// Results for one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// Document path.
    pub path: PathBuf,
    /// Per-block results in document order.
    pub blocks: Vec<BlockReport>,
}

impl DocumentReport {
    /// Blocks that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&BlockReport, &Failure)> {
        self.blocks.iter().filter_map(|b| match &b.outcome {
            BlockOutcome::Failed(f) => Some((b, f)),
            _ => None,
        })
    }
}

/// Summary of a pipeline run.
///
/// Documents without blocks are not listed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Artifacts rendered by this run.
    pub generated: usize,
    /// Blocks served from existing artifacts.
    pub cached: usize,
    /// Blocks whose artifact is missing and was not rendered (dry run).
    pub pending: usize,
    /// Blocks whose render failed.
    pub failed: usize,
    /// Per-document results.
    pub documents: Vec<DocumentReport>,
}

impl Report {
    pub(crate) fn record(&mut self, outcome: &BlockOutcome) {
        match outcome {
            BlockOutcome::Cached => self.cached += 1,
            BlockOutcome::Generated => self.generated += 1,
            BlockOutcome::Pending => self.pending += 1,
            BlockOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Total number of blocks seen.
    #[must_use]
    pub fn total(&self) -> usize {
        self.generated + self.cached + self.pending + self.failed
    }

    /// Whether any block failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
