//! Pipeline driver.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use diagen_cache::{ArtifactCache, ArtifactRef};
use diagen_corpus::Document;
use diagen_diagrams::consts::DEFAULT_FINGERPRINT_LEN;
use diagen_diagrams::{BlockSyntax, Fingerprint, extract};
use diagen_render::{PreconditionError, Published, RenderInvoker};
use rayon::prelude::*;

use crate::report::{BlockOutcome, BlockReport, DocumentReport, Failure, Report};

/// A block with its cache key resolved.
#[derive(Debug, Clone)]
pub struct PlannedBlock {
    /// Zero-based position in the document.
    pub ordinal: usize,
    /// Canonical content, the renderer input.
    pub canonical: String,
    /// Shortcode attributes.
    pub attrs: BTreeMap<String, String>,
    /// Artifact the block maps to.
    pub artifact: ArtifactRef,
    /// Whether the artifact already exists.
    pub hit: bool,
}

/// A document with at least one block.
#[derive(Debug, Clone)]
pub struct PlannedDocument {
    /// Document path.
    pub path: PathBuf,
    /// Blocks in document order.
    pub blocks: Vec<PlannedBlock>,
}

/// Events emitted by [`Pipeline::run_with_progress`].
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    /// A document with blocks is about to be processed.
    Document {
        /// Document path.
        path: &'a Path,
        /// Number of blocks in the document.
        blocks: usize,
    },
    /// A block reached its final outcome.
    Block {
        /// Path of the document holding the block.
        document: &'a Path,
        /// The block's result.
        report: &'a BlockReport,
    },
}

type RenderResults = HashMap<PathBuf, Result<Published, Failure>>;

/// Extracts, fingerprints, looks up and renders diagram blocks.
///
/// # Configuration
///
/// Create the pipeline from its parts, then configure using builder methods:
/// - [`fingerprint_len`](Self::fingerprint_len): hex characters kept in fingerprints (default: 8)
/// - [`jobs`](Self::jobs): renders run in parallel (default: 1)
/// - [`dry_run`](Self::dry_run): resolve everything but never call the renderer
pub struct Pipeline {
    syntax: BlockSyntax,
    cache: ArtifactCache,
    invoker: RenderInvoker,
    fingerprint_len: usize,
    jobs: usize,
    dry_run: bool,
}

impl Pipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(syntax: BlockSyntax, cache: ArtifactCache, invoker: RenderInvoker) -> Self {
        Self {
            syntax,
            cache,
            invoker,
            fingerprint_len: DEFAULT_FINGERPRINT_LEN,
            jobs: 1,
            dry_run: false,
        }
    }

    /// Set the fingerprint length in hex characters.
    #[must_use]
    pub fn fingerprint_len(mut self, len: usize) -> Self {
        self.fingerprint_len = len;
        self
    }

    /// Set the number of renders that may run at once.
    ///
    /// Renders for the same artifact are never run twice, whatever the value.
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Skip renderer invocation; misses are reported as pending.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The artifact cache.
    #[must_use]
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Check that the renderer is usable. Run this before [`run`](Self::run).
    pub fn check(&self) -> Result<(), PreconditionError> {
        self.invoker.renderer().check()
    }

    /// Extract and resolve all blocks without rendering.
    ///
    /// Documents without blocks are left out.
    #[must_use]
    pub fn plan(&self, documents: &[Document]) -> Vec<PlannedDocument> {
        documents
            .iter()
            .filter_map(|doc| {
                let blocks = extract(&doc.text, &self.syntax);
                if blocks.is_empty() {
                    return None;
                }
                let base_name = doc.base_name();
                let blocks = blocks
                    .into_iter()
                    .map(|block| {
                        let canonical = block.canonical().to_owned();
                        let fingerprint = Fingerprint::with_len(&canonical, self.fingerprint_len);
                        let artifact = self.cache.resolve(&base_name, &fingerprint);
                        let hit = self.cache.exists(&artifact);
                        PlannedBlock {
                            ordinal: block.ordinal,
                            canonical,
                            attrs: block.attrs,
                            artifact,
                            hit,
                        }
                    })
                    .collect();
                Some(PlannedDocument {
                    path: doc.path.clone(),
                    blocks,
                })
            })
            .collect()
    }

    /// Run the pipeline over `documents`.
    ///
    /// A failed render only affects the blocks that map to that artifact;
    /// every other block and document is still processed.
    pub fn run(&self, documents: &[Document]) -> Report {
        self.run_with_progress(documents, |_| {})
    }

    /// Run the pipeline, passing each [`Progress`] event to `on_progress`.
    ///
    /// With one job documents are handled in order: a document's events are
    /// emitted before the next document's renders start. With more jobs every
    /// miss is rendered on the pool first and the events follow in document
    /// order.
    pub fn run_with_progress<F>(&self, documents: &[Document], mut on_progress: F) -> Report
    where
        F: FnMut(Progress<'_>),
    {
        if !self.dry_run
            && let Err(e) = self.cache.ensure_dir()
        {
            tracing::warn!(
                dir = %self.cache.output_dir().display(),
                error = %e,
                "Failed to create output directory"
            );
        }

        let plan = self.plan(documents);

        let mut results = if self.dry_run || self.jobs <= 1 {
            RenderResults::new()
        } else {
            // One render per distinct artifact, in first-seen order.
            let mut seen = HashSet::new();
            let misses: Vec<&PlannedBlock> = plan
                .iter()
                .flat_map(|doc| &doc.blocks)
                .filter(|block| !block.hit && seen.insert(&block.artifact.output_path))
                .collect();
            self.render_all(&misses)
        };

        let mut report = Report::default();
        let mut claimed = HashSet::new();
        for doc in plan {
            tracing::info!(
                document = %doc.path.display(),
                blocks = doc.blocks.len(),
                "Processing document"
            );
            on_progress(Progress::Document {
                path: &doc.path,
                blocks: doc.blocks.len(),
            });

            let mut blocks = Vec::with_capacity(doc.blocks.len());
            for block in doc.blocks {
                let outcome = if block.hit {
                    BlockOutcome::Cached
                } else if self.dry_run {
                    BlockOutcome::Pending
                } else {
                    let path = &block.artifact.output_path;
                    // Misses not rendered on the pool are rendered here, once each.
                    let result = results
                        .entry(path.clone())
                        .or_insert_with(|| self.render_one(&block));
                    match result {
                        Ok(Published::Fresh) if claimed.insert(path.clone()) => {
                            BlockOutcome::Generated
                        }
                        Ok(_) => BlockOutcome::Cached,
                        Err(failure) => BlockOutcome::Failed(failure.clone()),
                    }
                };

                if let BlockOutcome::Failed(failure) = &outcome {
                    tracing::error!(
                        document = %doc.path.display(),
                        block = block.ordinal,
                        fingerprint = %block.artifact.fingerprint,
                        step = %failure.step,
                        scratch = ?failure.scratch,
                        "Failed to render diagram: {}",
                        failure.message
                    );
                }

                let block_report = BlockReport {
                    ordinal: block.ordinal,
                    artifact: block.artifact,
                    attrs: block.attrs,
                    outcome,
                };
                on_progress(Progress::Block {
                    document: &doc.path,
                    report: &block_report,
                });
                report.record(&block_report.outcome);
                blocks.push(block_report);
            }
            report.documents.push(DocumentReport {
                path: doc.path,
                blocks,
            });
        }

        tracing::info!(
            generated = report.generated,
            cached = report.cached,
            failed = report.failed,
            "Pipeline run completed"
        );
        report
    }

    /// Render each miss once on a bounded pool.
    fn render_all(&self, misses: &[&PlannedBlock]) -> RenderResults {
        let render = |block: &&PlannedBlock| {
            (block.artifact.output_path.clone(), self.render_one(block))
        };

        if misses.len() <= 1 {
            return misses.iter().map(render).collect();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => pool.install(|| misses.par_iter().map(render).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create thread pool, rendering sequentially");
                misses.iter().map(render).collect()
            }
        }
    }

    fn render_one(&self, block: &PlannedBlock) -> Result<Published, Failure> {
        let published = self
            .invoker
            .render(&block.canonical, &block.artifact)
            .map_err(Failure::from)?;
        match published {
            Published::Fresh => {
                tracing::info!(artifact = %block.artifact.file_name(), "Generated diagram");
            }
            Published::Existing => {
                tracing::info!(
                    artifact = %block.artifact.file_name(),
                    "Artifact appeared during render, keeping it"
                );
            }
        }
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use diagen_render::{InvokeError, Renderer};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Echoes its input into `diagram.svg`, failing on inputs containing `fail_on`.
    struct FakeRenderer {
        calls: Arc<AtomicUsize>,
        fail_on: Option<&'static str>,
    }

    impl Renderer for FakeRenderer {
        fn render(&self, input: &Path, output_dir: &Path) -> Result<(), InvokeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let content = fs::read_to_string(input).map_err(|e| InvokeError::Other(e.to_string()))?;
            if let Some(marker) = self.fail_on
                && content.contains(marker)
            {
                return Err(InvokeError::Exit {
                    code: Some(200),
                    stderr: "Syntax Error?".to_owned(),
                });
            }
            fs::write(output_dir.join("diagram.svg"), content)
                .map_err(|e| InvokeError::Other(e.to_string()))
        }
    }

    struct Setup {
        tmp: TempDir,
        calls: Arc<AtomicUsize>,
    }

    impl Setup {
        fn new() -> Self {
            Self {
                tmp: TempDir::new().unwrap(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn output_dir(&self) -> PathBuf {
            self.tmp.path().join("static/diagrams")
        }

        fn scratch_root(&self) -> PathBuf {
            self.tmp.path().join("temp/plantuml")
        }

        fn pipeline(&self, fail_on: Option<&'static str>) -> Pipeline {
            let renderer = FakeRenderer {
                calls: Arc::clone(&self.calls),
                fail_on,
            };
            Pipeline::new(
                BlockSyntax::default(),
                ArtifactCache::new(self.output_dir(), "svg"),
                RenderInvoker::new(Box::new(renderer), self.scratch_root()),
            )
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn artifacts(&self) -> Vec<String> {
            let mut names: Vec<_> = fs::read_dir(self.output_dir())
                .map(|d| {
                    d.filter_map(Result::ok)
                        .map(|e| e.file_name().to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default();
            names.sort();
            names
        }

        fn scratch_entries(&self) -> usize {
            fs::read_dir(self.scratch_root()).map(|d| d.count()).unwrap_or(0)
        }
    }

    fn block(content: &str) -> String {
        format!("{{{{< plantuml >}}}}{content}{{{{< /plantuml >}}}}")
    }

    fn doc(path: &str, blocks: &[&str]) -> Document {
        let body: Vec<String> = blocks.iter().map(|b| block(b)).collect();
        Document::new(path, format!("# Title\n\n{}\n", body.join("\n\ntext\n\n")))
    }

    fn artifact_name(base: &str, content: &str) -> String {
        format!("{base}-{}.svg", Fingerprint::of(content))
    }

    #[test]
    fn test_fresh_run_generates_artifacts() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["A -> B", "C -> D"])];

        let report = setup.pipeline(None).run(&docs);

        assert_eq!(report.generated, 2);
        assert_eq!(report.cached, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(setup.calls(), 2);
        let mut expected = vec![artifact_name("guide", "A -> B"), artifact_name("guide", "C -> D")];
        expected.sort();
        assert_eq!(setup.artifacts(), expected);
        assert_eq!(
            fs::read_to_string(setup.output_dir().join(artifact_name("guide", "A -> B"))).unwrap(),
            "A -> B"
        );
        assert_eq!(setup.scratch_entries(), 0);
    }

    #[test]
    fn test_rerun_is_fully_cached() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["A -> B", "C -> D"])];
        setup.pipeline(None).run(&docs);
        let artifact = setup.output_dir().join(artifact_name("guide", "A -> B"));
        let before = fs::read(&artifact).unwrap();

        let report = setup.pipeline(None).run(&docs);

        assert_eq!(report.generated, 0);
        assert_eq!(report.cached, 2);
        assert_eq!(setup.calls(), 2);
        assert_eq!(fs::read(&artifact).unwrap(), before);
        assert_eq!(setup.artifacts().len(), 2);
    }

    #[test]
    fn test_whitespace_variants_share_artifact() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["A -> B", "\n   A -> B  \n\n"])];

        let report = setup.pipeline(None).run(&docs);

        assert_eq!(setup.calls(), 1);
        assert_eq!(report.generated, 1);
        assert_eq!(report.cached, 1);
        let blocks = &report.documents[0].blocks;
        assert_eq!(blocks[0].outcome, BlockOutcome::Generated);
        assert_eq!(blocks[1].outcome, BlockOutcome::Cached);
        assert_eq!(blocks[0].artifact, blocks[1].artifact);
    }

    #[test]
    fn test_same_base_name_in_different_dirs_shares_artifact() {
        let setup = Setup::new();
        let docs = vec![
            doc("content/a/guide.md", &["A -> B"]),
            doc("content/b/guide.md", &["A -> B"]),
        ];

        let report = setup.pipeline(None).run(&docs);

        assert_eq!(setup.calls(), 1);
        assert_eq!(report.generated, 1);
        assert_eq!(report.cached, 1);
        assert_eq!(setup.artifacts(), vec![artifact_name("guide", "A -> B")]);
    }

    #[test]
    fn test_failure_is_isolated() {
        let setup = Setup::new();
        let docs = vec![
            doc("content/broken.md", &["A -> B", "BROKEN", "C -> D"]),
            doc("content/other.md", &["E -> F"]),
        ];

        let report = setup.pipeline(Some("BROKEN")).run(&docs);

        assert_eq!(report.generated, 3);
        assert_eq!(report.failed, 1);
        assert!(report.has_failures());

        let failures: Vec<_> = report.documents[0].failures().collect();
        assert_eq!(failures.len(), 1);
        let (failed_block, failure) = failures[0];
        assert_eq!(failed_block.ordinal, 1);
        assert_eq!(failure.step, "invoke");
        assert!(failure.message.contains("Syntax Error?"));
        assert!(!failed_block.artifact.exists());

        let scratch = failure.scratch.as_ref().unwrap();
        assert!(scratch.exists());
        assert_eq!(setup.scratch_entries(), 1);

        assert_eq!(report.documents[1].blocks[0].outcome, BlockOutcome::Generated);
    }

    #[test]
    fn test_failed_artifact_is_retried_next_run() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["BROKEN"])];

        let first = setup.pipeline(Some("BROKEN")).run(&docs);
        assert_eq!(first.failed, 1);

        let second = setup.pipeline(None).run(&docs);
        assert_eq!(second.generated, 1);
        assert_eq!(setup.calls(), 2);
    }

    #[test]
    fn test_duplicate_failure_rendered_once() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["BROKEN", "BROKEN"])];

        let report = setup.pipeline(Some("BROKEN")).run(&docs);

        assert_eq!(setup.calls(), 1);
        assert_eq!(report.failed, 2);
    }

    #[test]
    fn test_dry_run_reports_pending() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["A -> B", "C -> D"])];
        setup.pipeline(None).run(&[doc("content/guide.md", &["A -> B"])]);

        let report = setup.pipeline(None).dry_run(true).run(&docs);

        assert_eq!(report.cached, 1);
        assert_eq!(report.pending, 1);
        assert_eq!(report.generated, 0);
        assert_eq!(setup.calls(), 1);
        assert_eq!(setup.artifacts(), vec![artifact_name("guide", "A -> B")]);
    }

    #[test]
    fn test_dry_run_creates_nothing() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["A -> B"])];

        let report = setup.pipeline(None).dry_run(true).run(&docs);

        assert_eq!(report.pending, 1);
        assert!(!setup.output_dir().exists());
        assert!(!setup.scratch_root().exists());
    }

    #[test]
    fn test_documents_without_blocks_not_reported() {
        let setup = Setup::new();
        let docs = vec![
            Document::new("content/prose.md", "# Just prose\n"),
            doc("content/guide.md", &["A -> B"]),
        ];

        let report = setup.pipeline(None).run(&docs);

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].path, PathBuf::from("content/guide.md"));
        assert_eq!(report.total(), 1);
    }

    #[test]
    fn test_empty_block_is_rendered() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["   "])];

        let report = setup.pipeline(None).run(&docs);

        assert_eq!(report.generated, 1);
        assert_eq!(setup.artifacts(), vec![artifact_name("guide", "")]);
    }

    #[test]
    fn test_parallel_run_renders_each_artifact_once() {
        let setup = Setup::new();
        let contents: Vec<String> = (0..12).map(|i| format!("N{i} -> M{i}")).collect();
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let docs = vec![doc("content/guide.md", &refs), doc("content/guide.md", &refs)];

        let report = setup.pipeline(None).jobs(4).run(&docs);

        assert_eq!(setup.calls(), 12);
        assert_eq!(report.generated, 12);
        assert_eq!(report.cached, 12);
        assert_eq!(setup.artifacts().len(), 12);
        assert_eq!(setup.scratch_entries(), 0);
    }

    /// Label each progress event with the number of renders done so far.
    fn progress_log(setup: &Setup, pipeline: &Pipeline, docs: &[Document]) -> Vec<String> {
        let mut events = Vec::new();
        pipeline.run_with_progress(docs, |event| {
            let calls = setup.calls();
            events.push(match event {
                Progress::Document { path, blocks } => {
                    format!("{} ({blocks}) @{calls}", path.display())
                }
                Progress::Block { report, .. } => {
                    let status = match report.outcome {
                        BlockOutcome::Cached => "cached",
                        BlockOutcome::Generated => "generated",
                        BlockOutcome::Pending => "pending",
                        BlockOutcome::Failed(_) => "failed",
                    };
                    format!("  block {} {status} @{calls}", report.ordinal)
                }
            });
        });
        events
    }

    #[test]
    fn test_sequential_run_reports_each_document_before_the_next() {
        let setup = Setup::new();
        let docs = vec![
            doc("content/a.md", &["A -> B", "BROKEN"]),
            Document::new("content/prose.md", "# Just prose\n"),
            doc("content/b.md", &["C -> D", "A -> B"]),
        ];

        let events = progress_log(&setup, &setup.pipeline(Some("BROKEN")), &docs);

        assert_eq!(
            events,
            vec![
                "content/a.md (2) @0",
                "  block 0 generated @1",
                "  block 1 failed @2",
                "content/b.md (2) @2",
                "  block 0 generated @3",
                "  block 1 cached @3",
            ]
        );
    }

    #[test]
    fn test_parallel_run_reports_every_document() {
        let setup = Setup::new();
        let docs = vec![
            doc("content/a.md", &["A -> B", "C -> D"]),
            doc("content/b.md", &["E -> F"]),
        ];

        let events = progress_log(&setup, &setup.pipeline(None).jobs(4), &docs);

        assert_eq!(
            events,
            vec![
                "content/a.md (2) @3",
                "  block 0 generated @3",
                "  block 1 generated @3",
                "content/b.md (1) @3",
                "  block 0 generated @3",
            ]
        );
    }

    #[test]
    fn test_dry_run_reports_progress_without_rendering() {
        let setup = Setup::new();
        let docs = vec![doc("content/a.md", &["A -> B"])];

        let events = progress_log(&setup, &setup.pipeline(None).dry_run(true), &docs);

        assert_eq!(events, vec!["content/a.md (1) @0", "  block 0 pending @0"]);
    }

    #[test]
    fn test_directory_at_artifact_path_fails_every_run() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["A -> B"])];
        let artifact = setup.output_dir().join(artifact_name("guide", "A -> B"));
        fs::create_dir_all(&artifact).unwrap();

        for _ in 0..2 {
            let report = setup.pipeline(None).run(&docs);

            assert_eq!(report.generated, 0);
            assert_eq!(report.failed, 1);
            let (_, failure) = report.documents[0].failures().next().unwrap();
            assert_eq!(failure.step, "publish");
            assert!(artifact.is_dir());
        }
        assert_eq!(setup.calls(), 2);
    }

    /// Simulates another process publishing the artifact mid-render.
    struct RacingRenderer {
        output_dir: PathBuf,
    }

    impl Renderer for RacingRenderer {
        fn render(&self, input: &Path, output_dir: &Path) -> Result<(), InvokeError> {
            let fingerprint = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            fs::write(self.output_dir.join(format!("guide-{fingerprint}.svg")), "other")
                .map_err(|e| InvokeError::Other(e.to_string()))?;
            fs::write(output_dir.join("diagram.svg"), "fresh")
                .map_err(|e| InvokeError::Other(e.to_string()))
        }
    }

    #[test]
    fn test_artifact_appearing_during_render_counts_as_cached() {
        let setup = Setup::new();
        let pipeline = Pipeline::new(
            BlockSyntax::default(),
            ArtifactCache::new(setup.output_dir(), "svg"),
            RenderInvoker::new(
                Box::new(RacingRenderer {
                    output_dir: setup.output_dir(),
                }),
                setup.scratch_root(),
            ),
        );
        let docs = vec![doc("content/guide.md", &["A -> B"])];

        let report = pipeline.run(&docs);

        assert_eq!(report.generated, 0);
        assert_eq!(report.cached, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(
            fs::read_to_string(setup.output_dir().join(artifact_name("guide", "A -> B"))).unwrap(),
            "other"
        );
        assert_eq!(setup.scratch_entries(), 0);
    }

    #[test]
    fn test_fingerprint_len_applies_to_names() {
        let setup = Setup::new();
        let docs = vec![doc("content/guide.md", &["A -> B"])];

        let report = setup.pipeline(None).fingerprint_len(12).run(&docs);

        let name = report.documents[0].blocks[0].artifact.file_name().to_owned();
        assert_eq!(name, format!("guide-{}.svg", Fingerprint::with_len("A -> B", 12)));
        assert_eq!(name.len(), "guide-".len() + 12 + ".svg".len());
    }

    #[test]
    fn test_plan_marks_hits() {
        let setup = Setup::new();
        let pipeline = setup.pipeline(None);
        pipeline.run(&[doc("content/guide.md", &["A -> B"])]);

        let plan = pipeline.plan(&[doc("content/guide.md", &["A -> B", "C -> D"])]);

        let hits: Vec<_> = plan[0].blocks.iter().map(|b| (b.canonical.as_str(), b.hit)).collect();
        assert_eq!(hits, vec![("A -> B", true), ("C -> D", false)]);
    }
}
