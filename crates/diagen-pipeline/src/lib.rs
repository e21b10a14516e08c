//! Diagram generation pipeline.
//!
//! Ties the other diagen crates together. For every document:
//!
//! 1. extract diagram blocks ([`diagen_diagrams::extract`])
//! 2. fingerprint their canonical content
//! 3. resolve the artifact path and check the cache ([`diagen_cache`])
//! 4. render misses through the invoker ([`diagen_render`])
//!
//! Each distinct artifact is rendered at most once per run, no matter how
//! many blocks map to it. Failures are recorded per block in the [`Report`]
//! and never stop the run.
//!
//! # Example
//!
//! ```ignore
//! use diagen_cache::ArtifactCache;
//! use diagen_corpus::Corpus;
//! use diagen_diagrams::BlockSyntax;
//! use diagen_pipeline::Pipeline;
//! use diagen_render::{CommandRenderer, RenderInvoker};
//!
//! let invoker = RenderInvoker::new(
//!     Box::new(CommandRenderer::plantuml("bin/plantuml.jar")),
//!     "temp/plantuml",
//! );
//! let pipeline = Pipeline::new(
//!     BlockSyntax::default(),
//!     ArtifactCache::new("static/diagrams", "svg"),
//!     invoker,
//! );
//! pipeline.check()?;
//! let report = pipeline.run(&Corpus::new("content", "md").load()?);
//! println!("generated {}, cached {}", report.generated, report.cached);
//! ```

mod pipeline;
mod report;

pub use pipeline::{Pipeline, PlannedBlock, PlannedDocument, Progress};
pub use report::{BlockOutcome, BlockReport, DocumentReport, Failure, Report};
