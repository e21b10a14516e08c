//! CLI error types.

use diagen_config::ConfigError;
use diagen_corpus::CorpusError;
use diagen_diagrams::SyntaxError;
use diagen_render::PreconditionError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Corpus(#[from] CorpusError),

    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} diagram(s) failed to render")]
    Failures(usize),
}
