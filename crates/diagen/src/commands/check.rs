//! `diagen check` command implementation.

use std::path::Path;

use diagen_config::Config;
use diagen_render::Renderer;

use super::build_renderer;
use crate::error::CliError;
use crate::output::Output;

/// Execute the check command.
///
/// # Errors
///
/// Returns an error if the renderer program or jar is missing.
pub(crate) fn execute(config_path: Option<&Path>) -> Result<(), CliError> {
    let output = Output::new();
    let config = Config::load(config_path, None)?;

    if let Some(path) = &config.config_path {
        output.info(&format!("Using {}", path.display()));
    }
    build_renderer(&config).check()?;
    tracing::debug!(program = %config.renderer.program, "Renderer check passed");

    let renderer = &config.renderer;
    match &renderer.jar {
        Some(jar) => output.success(&format!(
            "Renderer available: {} -jar {}",
            renderer.program,
            jar.display()
        )),
        None => output.success(&format!("Renderer available: {}", renderer.program)),
    }
    Ok(())
}
