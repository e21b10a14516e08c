//! `diagen list` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use diagen_config::{CliSettings, Config};
use diagen_pipeline::PlannedDocument;
use serde::Serialize;

use super::{build_pipeline, load_documents};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the list command.
#[derive(Args)]
pub(crate) struct ListArgs {
    /// Content source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Only list blocks whose artifact is missing.
    #[arg(long)]
    missing: bool,

    /// Print entries as JSON on stdout.
    #[arg(long)]
    json: bool,
}

/// One listed block.
#[derive(Debug, PartialEq, Eq, Serialize)]
struct Entry {
    document: PathBuf,
    ordinal: usize,
    fingerprint: String,
    published_path: String,
    cached: bool,
}

impl ListArgs {
    /// Execute the list command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the corpus cannot be read.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            ..Default::default()
        };
        let config = Config::load(config_path, Some(&cli_settings))?;
        let pipeline = build_pipeline(&config)?;
        let plan = pipeline.plan(&load_documents(&config)?);

        let entries: Vec<Entry> = entries(&plan, &config.diagrams.published_prefix)
            .into_iter()
            .filter(|e| !self.missing || !e.cached)
            .collect();

        if self.json {
            output.data(&serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        for entry in &entries {
            let status = if entry.cached { "cached" } else { "missing" };
            output.data(&format!(
                "{}\t{}\t{}\t{}\t{status}",
                entry.document.display(),
                entry.ordinal,
                entry.fingerprint,
                entry.published_path
            ));
        }
        let missing = entries.iter().filter(|e| !e.cached).count();
        output.detail(&format!("{} block(s), {missing} missing", entries.len()));
        Ok(())
    }
}

fn entries(plan: &[PlannedDocument], prefix: &str) -> Vec<Entry> {
    plan.iter()
        .flat_map(|doc| {
            doc.blocks.iter().map(|block| Entry {
                document: doc.path.clone(),
                ordinal: block.ordinal,
                fingerprint: block.artifact.fingerprint.to_string(),
                published_path: block.artifact.published_path(prefix),
                cached: block.hit,
            })
        })
        .collect()
}
