//! Configuration management for diagen.
//!
//! Parses `diagen.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `diagrams.published_prefix`
//! - `renderer.program`
//! - `renderer.jar`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use diagen_diagrams::consts::{
    DEFAULT_FINGERPRINT_LEN, DEFAULT_LANGUAGE, DEFAULT_MARKER, MAX_FINGERPRINT_LEN,
    MIN_FINGERPRINT_LEN,
};
use diagen_render::MultipleOutputs;
use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override content source directory.
    pub source_dir: Option<PathBuf>,
    /// Override artifact output directory.
    pub output_dir: Option<PathBuf>,
    /// Override number of parallel renders.
    pub jobs: Option<usize>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "diagen.toml";

/// Raw configuration as parsed from TOML (paths as strings).
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigRaw {
    content: ContentConfigRaw,
    diagrams: DiagramsConfigRaw,
    renderer: RendererConfigRaw,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ContentConfigRaw {
    source_dir: Option<String>,
    extension: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DiagramsConfigRaw {
    marker: Option<String>,
    language: Option<String>,
    output_dir: Option<String>,
    published_prefix: Option<String>,
    output_extension: Option<String>,
    input_extension: Option<String>,
    scratch_dir: Option<String>,
    fingerprint_len: Option<usize>,
    jobs: Option<usize>,
    multiple_outputs: Option<MultipleOutputs>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RendererConfigRaw {
    program: Option<String>,
    jar: Option<String>,
    args: Option<Vec<String>>,
    output_flag: Option<String>,
    timeout_secs: Option<u64>,
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    /// Document corpus settings.
    pub content: ContentConfig,
    /// Block syntax, cache and render settings.
    pub diagrams: DiagramsConfig,
    /// External renderer command.
    pub renderer: RendererConfig,
    /// Path to the config file, if one was loaded.
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Resolved content configuration.
#[derive(Debug)]
pub struct ContentConfig {
    /// Directory scanned for documents.
    pub source_dir: PathBuf,
    /// Document file extension, without the dot.
    pub extension: String,
}

/// Resolved diagrams configuration with absolute paths.
#[derive(Debug)]
pub struct DiagramsConfig {
    /// Shortcode marker name.
    pub marker: String,
    /// Fence language stripped from block bodies.
    pub language: String,
    /// Publish directory, which is also the cache.
    pub output_dir: PathBuf,
    /// URL prefix under which `output_dir` is served.
    pub published_prefix: String,
    /// Artifact file extension.
    pub output_extension: String,
    /// Renderer input file extension.
    pub input_extension: String,
    /// Root of per-render scratch directories.
    pub scratch_dir: PathBuf,
    /// Fingerprint length in hex characters.
    pub fingerprint_len: usize,
    /// Renders run in parallel.
    pub jobs: usize,
    /// Policy for renders that produce several files.
    pub multiple_outputs: MultipleOutputs,
}

/// Resolved renderer configuration.
#[derive(Debug)]
pub struct RendererConfig {
    /// Program to run.
    pub program: String,
    /// Jar passed as `-jar <path>`; `None` runs `program` directly.
    pub jar: Option<PathBuf>,
    /// Extra arguments before the output flag.
    pub args: Vec<String>,
    /// Flag that introduces the output directory.
    pub output_flag: String,
    /// Limit for one renderer run.
    pub timeout: Duration,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`renderer.jar`").
        field: String,
        /// Error message (e.g., "${`PLANTUML_JAR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require an extension field to be non-empty and free of separators.
fn require_extension(value: &str, field: &str) -> Result<(), ConfigError> {
    require_non_empty(value, field)?;
    if value.contains(['/', '\\']) || value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "{field} must be a plain file extension"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `diagen.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.content.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.diagrams.output_dir.clone_from(output_dir);
        }
        if let Some(jobs) = settings.jobs {
            self.diagrams.jobs = jobs;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self::resolve(ConfigRaw::default(), base)
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut raw: ConfigRaw = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        raw.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::resolve(raw, config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Fill in defaults and resolve relative paths against `base`.
    fn resolve(raw: ConfigRaw, base: &Path) -> Self {
        let path = |value: Option<String>, default: &str| base.join(value.as_deref().unwrap_or(default));
        let owned = |value: Option<String>, default: &str| value.unwrap_or_else(|| default.to_owned());

        let ConfigRaw {
            content,
            diagrams,
            renderer,
        } = raw;

        let jar = match renderer.jar {
            Some(jar) if jar.is_empty() => None,
            jar => Some(path(jar, "bin/plantuml.jar")),
        };

        Self {
            content: ContentConfig {
                source_dir: path(content.source_dir, "content"),
                extension: trim_dot(owned(content.extension, "md")),
            },
            diagrams: DiagramsConfig {
                marker: owned(diagrams.marker, DEFAULT_MARKER),
                language: owned(diagrams.language, DEFAULT_LANGUAGE),
                output_dir: path(diagrams.output_dir, "static/diagrams"),
                published_prefix: owned(diagrams.published_prefix, "/diagrams"),
                output_extension: trim_dot(owned(diagrams.output_extension, "svg")),
                input_extension: trim_dot(owned(diagrams.input_extension, "puml")),
                scratch_dir: path(diagrams.scratch_dir, "temp/plantuml"),
                fingerprint_len: diagrams.fingerprint_len.unwrap_or(DEFAULT_FINGERPRINT_LEN),
                jobs: diagrams.jobs.unwrap_or(1),
                multiple_outputs: diagrams.multiple_outputs.unwrap_or_default(),
            },
            renderer: RendererConfig {
                program: owned(renderer.program, "java"),
                jar,
                args: renderer.args.unwrap_or_else(|| vec!["-tsvg".to_owned()]),
                output_flag: owned(renderer.output_flag, "-o"),
                timeout: Duration::from_secs(renderer.timeout_secs.unwrap_or(60)),
            },
            config_path: None,
        }
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI settings
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_content()?;
        self.validate_diagrams()?;
        self.validate_renderer()?;
        Ok(())
    }

    fn validate_content(&self) -> Result<(), ConfigError> {
        require_extension(&self.content.extension, "content.extension")
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        let diagrams = &self.diagrams;
        require_non_empty(&diagrams.marker, "diagrams.marker")?;
        require_non_empty(&diagrams.language, "diagrams.language")?;
        require_extension(&diagrams.output_extension, "diagrams.output_extension")?;
        require_extension(&diagrams.input_extension, "diagrams.input_extension")?;

        if !(MIN_FINGERPRINT_LEN..=MAX_FINGERPRINT_LEN).contains(&diagrams.fingerprint_len) {
            return Err(ConfigError::Validation(format!(
                "diagrams.fingerprint_len must be between {MIN_FINGERPRINT_LEN} and {MAX_FINGERPRINT_LEN}"
            )));
        }
        if diagrams.jobs == 0 {
            return Err(ConfigError::Validation(
                "diagrams.jobs must be greater than 0".to_owned(),
            ));
        }
        if !diagrams.published_prefix.is_empty() && !diagrams.published_prefix.starts_with('/') {
            return Err(ConfigError::Validation(
                "diagrams.published_prefix must start with /".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_renderer(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.renderer.program, "renderer.program")?;
        require_non_empty(&self.renderer.output_flag, "renderer.output_flag")?;
        if self.renderer.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "renderer.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}

impl ConfigRaw {
    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref prefix) = self.diagrams.published_prefix {
            self.diagrams.published_prefix =
                Some(expand::expand_env(prefix, "diagrams.published_prefix")?);
        }
        if let Some(ref program) = self.renderer.program {
            self.renderer.program = Some(expand::expand_env(program, "renderer.program")?);
        }
        if let Some(ref jar) = self.renderer.jar {
            self.renderer.jar = Some(expand::expand_env(jar, "renderer.jar")?);
        }
        Ok(())
    }
}

fn trim_dot(extension: String) -> String {
    match extension.strip_prefix('.') {
        Some(rest) => rest.to_owned(),
        None => extension,
    }
}
