//! `diagen hash` command implementation.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Args;
use diagen_cache::ArtifactCache;
use diagen_config::Config;
use diagen_corpus::Document;
use diagen_diagrams::{Fingerprint, canonicalize};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the hash command.
#[derive(Args)]
pub(crate) struct HashArgs {
    /// Diagram source file (default: read stdin).
    file: Option<PathBuf>,

    /// Document the diagram belongs to; prints the artifact file name instead.
    #[arg(short, long)]
    document: Option<PathBuf>,
}

impl HashArgs {
    /// Execute the hash command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the input cannot be read.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(config_path, None)?;

        let source = match &self.file {
            Some(path) => std::fs::read_to_string(path)?,
            None => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        let fingerprint =
            Fingerprint::with_len(canonicalize(&source), config.diagrams.fingerprint_len);
        match &self.document {
            Some(document) => {
                let cache = ArtifactCache::new(
                    &config.diagrams.output_dir,
                    config.diagrams.output_extension.clone(),
                );
                let artifact = cache.resolve(&Document::new(document, "").base_name(), &fingerprint);
                output.data(artifact.file_name());
            }
            None => output.data(fingerprint.as_str()),
        }
        Ok(())
    }
}
