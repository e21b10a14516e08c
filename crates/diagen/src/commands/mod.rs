//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod generate;
pub(crate) mod hash;
pub(crate) mod list;

pub(crate) use generate::GenerateArgs;
pub(crate) use hash::HashArgs;
pub(crate) use list::ListArgs;

use diagen_cache::ArtifactCache;
use diagen_config::Config;
use diagen_corpus::{Corpus, Document};
use diagen_diagrams::BlockSyntax;
use diagen_pipeline::Pipeline;
use diagen_render::{CommandRenderer, RenderInvoker};

use crate::error::CliError;

/// Build the external renderer described by `[renderer]`.
pub(crate) fn build_renderer(config: &Config) -> CommandRenderer {
    let renderer = &config.renderer;
    let command = CommandRenderer::new(renderer.program.clone())
        .args(renderer.args.iter().cloned())
        .output_flag(renderer.output_flag.clone())
        .timeout(renderer.timeout);
    match &renderer.jar {
        Some(jar) => command.jar(jar.clone()),
        None => command,
    }
}

/// Build the pipeline from the resolved configuration.
pub(crate) fn build_pipeline(config: &Config) -> Result<Pipeline, CliError> {
    let diagrams = &config.diagrams;
    tracing::debug!(
        config = ?config.config_path,
        output_dir = %diagrams.output_dir.display(),
        scratch_dir = %diagrams.scratch_dir.display(),
        jobs = diagrams.jobs,
        "Building pipeline"
    );
    let syntax = BlockSyntax::new(&diagrams.marker, &diagrams.language)?;
    let cache = ArtifactCache::new(&diagrams.output_dir, diagrams.output_extension.clone());
    let invoker = RenderInvoker::new(Box::new(build_renderer(config)), &diagrams.scratch_dir)
        .input_extension(diagrams.input_extension.clone())
        .multiple_outputs(diagrams.multiple_outputs);

    Ok(Pipeline::new(syntax, cache, invoker)
        .fingerprint_len(diagrams.fingerprint_len)
        .jobs(diagrams.jobs))
}

/// Load every document of the configured corpus.
pub(crate) fn load_documents(config: &Config) -> Result<Vec<Document>, CliError> {
    let corpus = Corpus::new(&config.content.source_dir, config.content.extension.clone());
    Ok(corpus.load()?)
}
