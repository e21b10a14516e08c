//! `diagen generate` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use diagen_config::{CliSettings, Config};
use diagen_pipeline::{BlockOutcome, Progress, Report};

use super::{build_pipeline, load_documents};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the generate command.
#[derive(Args)]
pub(crate) struct GenerateArgs {
    /// Content source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Artifact output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of diagrams rendered in parallel (overrides config).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Show what would be rendered without running the renderer.
    #[arg(long)]
    dry_run: bool,

    /// Exit with an error status if any diagram fails to render.
    #[arg(long)]
    fail_on_error: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

impl GenerateArgs {
    /// Execute the generate command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or the renderer check fails, or if
    /// `--fail-on-error` is set and any diagram failed.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            jobs: self.jobs,
        };
        let config = Config::load(config_path, Some(&cli_settings))?;

        let pipeline = build_pipeline(&config)?.dry_run(self.dry_run);
        if !self.dry_run {
            pipeline.check()?;
            tracing::info!(program = %config.renderer.program, "Renderer check passed");
        }

        let documents = load_documents(&config)?;
        output.info(&format!(
            "Scanning {} document(s) in {}...",
            documents.len(),
            config.content.source_dir.display()
        ));

        let dry_run = self.dry_run;
        let report = pipeline.run_with_progress(&documents, |event| {
            print_progress(&output, event, dry_run);
        });

        if self.json {
            output.data(&serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&output, &report, self.dry_run);
        }

        if self.fail_on_error && report.has_failures() {
            return Err(CliError::Failures(report.failed));
        }
        Ok(())
    }
}

/// Print a progress event as the pipeline reaches it.
fn print_progress(output: &Output, event: Progress<'_>, dry_run: bool) {
    match event {
        Progress::Document { path, blocks } => {
            output.info(&format!("Processing {} ({blocks} diagram(s))", path.display()));
        }
        Progress::Block { document, report } => match &report.outcome {
            BlockOutcome::Failed(failure) => {
                output.error(&format!(
                    "{} (block {}): {} failed: {}",
                    document.display(),
                    report.ordinal,
                    failure.step,
                    failure.message
                ));
                if let Some(scratch) = &failure.scratch {
                    output.detail(&format!("  scratch kept at {}", scratch.display()));
                }
            }
            BlockOutcome::Pending if dry_run => {
                output.info(&format!(
                    "  would render {} (block {})",
                    report.artifact.file_name(),
                    report.ordinal
                ));
            }
            _ => {}
        },
    }
}

/// Print the run summary.
fn print_report(output: &Output, report: &Report, dry_run: bool) {
    output.separator();
    if dry_run {
        output.highlight("[DRY RUN] No diagrams rendered.");
        output.info(&format!("Pending: {}", report.pending));
    } else {
        output.success(&format!("Generated: {}", report.generated));
    }
    output.info(&format!("Cached: {}", report.cached));
    if report.failed > 0 {
        output.warning(&format!("Failed: {}", report.failed));
    }
}
