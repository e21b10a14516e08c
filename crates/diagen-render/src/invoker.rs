//! Render invocation for cache misses.
//!
//! [`RenderInvoker`] stages canonical content into a private scratch
//! directory, runs the [`Renderer`], picks up whatever output file appeared
//! and moves it to the artifact path chosen by the cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use diagen_cache::ArtifactRef;
use serde::Deserialize;

use crate::error::{RenderError, RenderErrorKind};
use crate::renderer::Renderer;
use crate::scratch::Scratch;

/// What to do when a render produces more than one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultipleOutputs {
    /// Publish the lexicographically first file and log the rest.
    #[default]
    First,
    /// Fail the render.
    Reject,
}

/// How a successful render reached the artifact path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    /// The fresh output was moved into place.
    Fresh,
    /// An artifact file appeared while the renderer ran and was kept as is.
    Existing,
}

/// Runs the renderer for cache misses and publishes the result.
///
/// # Example
///
/// ```ignore
/// use diagen_render::{CommandRenderer, RenderInvoker};
///
/// let invoker = RenderInvoker::new(
///     Box::new(CommandRenderer::plantuml("bin/plantuml.jar")),
///     "temp/plantuml",
/// );
/// let published = invoker.render("A -> B", &artifact_ref)?;
/// ```
pub struct RenderInvoker {
    renderer: Box<dyn Renderer>,
    scratch_root: PathBuf,
    input_extension: String,
    multiple_outputs: MultipleOutputs,
}

impl RenderInvoker {
    /// Create an invoker that stages renders under `scratch_root`.
    ///
    /// The input file extension defaults to `puml`.
    pub fn new(renderer: Box<dyn Renderer>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            scratch_root: scratch_root.into(),
            input_extension: "puml".to_owned(),
            multiple_outputs: MultipleOutputs::default(),
        }
    }

    /// Extension of the staged input file.
    #[must_use]
    pub fn input_extension(mut self, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        self.input_extension = extension.trim_start_matches('.').to_owned();
        self
    }

    /// Policy for renders that produce several output files.
    #[must_use]
    pub fn multiple_outputs(mut self, policy: MultipleOutputs) -> Self {
        self.multiple_outputs = policy;
        self
    }

    /// The wrapped renderer.
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Root directory for scratch state.
    #[must_use]
    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Render `canonical` content into `artifact`.
    ///
    /// On success the scratch directory is removed completely, including any
    /// extra files the renderer produced. On failure it is left in place and
    /// its path is returned in the error.
    ///
    /// An artifact file that appears while the renderer runs (another process
    /// got there first) is kept as is, the fresh output is discarded and
    /// [`Published::Existing`] is returned. Anything other than a regular
    /// file at the artifact path fails the publish step.
    pub fn render(&self, canonical: &str, artifact: &ArtifactRef) -> Result<Published, RenderError> {
        let fingerprint = &artifact.fingerprint;
        let fail = |kind: RenderErrorKind, scratch: Option<&Scratch>| RenderError {
            fingerprint: fingerprint.clone(),
            kind,
            scratch: scratch.map(|s| s.dir().to_path_buf()),
        };

        let scratch = Scratch::prepare(&self.scratch_root, fingerprint, &self.input_extension)
            .map_err(|e| fail(RenderErrorKind::Scratch(e), None))?;

        fs::write(scratch.input(), canonical)
            .map_err(|e| fail(RenderErrorKind::Input(e), Some(&scratch)))?;

        self.renderer
            .render(scratch.input(), scratch.output_dir())
            .map_err(|e| fail(RenderErrorKind::Invoke(e), Some(&scratch)))?;

        let extension = artifact
            .output_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let outputs = scratch
            .outputs(&extension)
            .map_err(|e| fail(RenderErrorKind::Discover(e), Some(&scratch)))?;
        let chosen = self
            .choose_output(&outputs, &extension)
            .map_err(|kind| fail(kind, Some(&scratch)))?;

        let published = publish(chosen, &artifact.output_path)
            .map_err(|e| fail(RenderErrorKind::Publish(e), Some(&scratch)))?;

        scratch.remove();
        Ok(published)
    }

    fn choose_output<'a>(
        &self,
        outputs: &'a [PathBuf],
        extension: &str,
    ) -> Result<&'a Path, RenderErrorKind> {
        match outputs {
            [] => Err(RenderErrorKind::NoOutput(extension.to_owned())),
            [only] => Ok(only.as_path()),
            [first, rest @ ..] => match self.multiple_outputs {
                MultipleOutputs::First => {
                    let discarded: Vec<String> = rest.iter().map(|p| file_name(p)).collect();
                    tracing::warn!(
                        chosen = %file_name(first),
                        discarded = %discarded.join(", "),
                        "renderer produced several files, keeping the first"
                    );
                    Ok(first.as_path())
                }
                MultipleOutputs::Reject => Err(RenderErrorKind::MultipleOutputs(
                    outputs.iter().map(|p| file_name(p)).collect(),
                )),
            },
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Move `from` to `to` without overwriting an existing artifact.
///
/// Same rule as the cache lookup: only a regular file counts as an artifact.
fn publish(from: &Path, to: &Path) -> io::Result<Published> {
    if to.is_file() {
        tracing::debug!(path = %to.display(), "artifact appeared during render, keeping existing");
        return Ok(Published::Existing);
    }
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a file", to.display()),
        ));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    // rename fails across filesystems; fall back to copy.
    if fs::rename(from, to).is_err() {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(Published::Fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InvokeError, RenderStep};
    use diagen_cache::ArtifactCache;
    use diagen_diagrams::Fingerprint;
    use tempfile::TempDir;

    /// Writes the input back out under fixed, title-like names.
    struct TitleRenderer {
        names: Vec<&'static str>,
    }

    impl TitleRenderer {
        fn new(names: &[&'static str]) -> Self {
            Self {
                names: names.to_vec(),
            }
        }
    }

    impl Renderer for TitleRenderer {
        fn render(&self, input: &Path, output_dir: &Path) -> Result<(), InvokeError> {
            let content = fs::read_to_string(input).map_err(|e| InvokeError::Other(e.to_string()))?;
            for name in &self.names {
                fs::write(output_dir.join(name), format!("{name}|{content}"))
                    .map_err(|e| InvokeError::Other(e.to_string()))?;
            }
            Ok(())
        }
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&self, _input: &Path, _output_dir: &Path) -> Result<(), InvokeError> {
            Err(InvokeError::Exit {
                code: Some(1),
                stderr: "Syntax Error?".to_owned(),
            })
        }
    }

    struct Setup {
        _tmp: TempDir,
        scratch_root: PathBuf,
        cache: ArtifactCache,
    }

    fn setup() -> Setup {
        let tmp = TempDir::new().unwrap();
        let scratch_root = tmp.path().join("temp/plantuml");
        let cache = ArtifactCache::new(tmp.path().join("static/diagrams"), "svg");
        Setup {
            _tmp: tmp,
            scratch_root,
            cache,
        }
    }

    fn scratch_entries(root: &Path) -> usize {
        fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_render_publishes_under_artifact_name() {
        let s = setup();
        let invoker = RenderInvoker::new(Box::new(TitleRenderer::new(&["Login Flow.svg"])), &s.scratch_root);
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));

        let published = invoker.render("A -> B", &artifact).unwrap();

        assert_eq!(published, Published::Fresh);
        assert_eq!(artifact.file_name(), "guide-299af3f1.svg");
        assert!(artifact.exists());
        assert_eq!(
            fs::read_to_string(&artifact.output_path).unwrap(),
            "Login Flow.svg|A -> B"
        );
    }

    #[test]
    fn test_render_success_leaves_no_scratch_state() {
        let s = setup();
        let invoker = RenderInvoker::new(
            Box::new(TitleRenderer::new(&["one.svg", "two.svg", "three.svg"])),
            &s.scratch_root,
        );
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));

        invoker.render("A -> B", &artifact).unwrap();

        assert!(s.scratch_root.is_dir());
        assert_eq!(scratch_entries(&s.scratch_root), 0);
    }

    #[test]
    fn test_render_multiple_outputs_takes_first_sorted() {
        let s = setup();
        let invoker = RenderInvoker::new(
            Box::new(TitleRenderer::new(&["zeta.svg", "alpha.svg"])),
            &s.scratch_root,
        );
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));

        invoker.render("A -> B", &artifact).unwrap();
        assert_eq!(
            fs::read_to_string(&artifact.output_path).unwrap(),
            "alpha.svg|A -> B"
        );
        assert_eq!(scratch_entries(&s.scratch_root), 0);
    }

    #[test]
    fn test_render_multiple_outputs_reject() {
        let s = setup();
        let invoker = RenderInvoker::new(
            Box::new(TitleRenderer::new(&["zeta.svg", "alpha.svg"])),
            &s.scratch_root,
        )
        .multiple_outputs(MultipleOutputs::Reject);
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));

        let err = invoker.render("A -> B", &artifact).unwrap_err();
        match &err.kind {
            RenderErrorKind::MultipleOutputs(names) => {
                assert_eq!(names, &vec!["alpha.svg".to_owned(), "zeta.svg".to_owned()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!artifact.exists());
    }

    #[test]
    fn test_render_ignores_other_extensions() {
        let s = setup();
        let invoker = RenderInvoker::new(
            Box::new(TitleRenderer::new(&["diagram.png", "diagram.svg"])),
            &s.scratch_root,
        )
        .multiple_outputs(MultipleOutputs::Reject);
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));

        invoker.render("A -> B", &artifact).unwrap();
        assert_eq!(
            fs::read_to_string(&artifact.output_path).unwrap(),
            "diagram.svg|A -> B"
        );
    }

    #[test]
    fn test_render_input_file_named_by_fingerprint() {
        let s = setup();
        let invoker =
            RenderInvoker::new(Box::new(FailingRenderer), &s.scratch_root).input_extension(".txt");
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));

        let err = invoker.render("A -> B", &artifact).unwrap_err();
        let scratch = err.scratch.unwrap();
        assert!(scratch.join("299af3f1.txt").is_file());
        assert!(scratch.join("out").is_dir());
    }

    #[test]
    fn test_render_failure_keeps_scratch_for_inspection() {
        let s = setup();
        let invoker = RenderInvoker::new(Box::new(FailingRenderer), &s.scratch_root);
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));

        let err = invoker.render("A -> B", &artifact).unwrap_err();

        assert_eq!(err.step(), RenderStep::Invoke);
        assert_eq!(err.fingerprint, artifact.fingerprint);
        let scratch = err.scratch.expect("scratch path reported");
        assert!(scratch.is_dir());
        assert_eq!(
            fs::read_to_string(scratch.join("299af3f1.puml")).unwrap(),
            "A -> B"
        );
        assert!(!artifact.exists());
    }

    #[test]
    fn test_render_no_output() {
        let s = setup();
        let invoker = RenderInvoker::new(Box::new(TitleRenderer::new(&[])), &s.scratch_root);
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));

        let err = invoker.render("A -> B", &artifact).unwrap_err();
        assert!(matches!(err.kind, RenderErrorKind::NoOutput(ref ext) if ext == "svg"));
        assert_eq!(err.step(), RenderStep::Discover);
    }

    #[test]
    fn test_render_never_overwrites_existing_artifact() {
        let s = setup();
        let invoker = RenderInvoker::new(Box::new(TitleRenderer::new(&["x.svg"])), &s.scratch_root);
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));
        s.cache.ensure_dir().unwrap();
        fs::write(&artifact.output_path, "original").unwrap();

        let published = invoker.render("A -> B", &artifact).unwrap();

        assert_eq!(published, Published::Existing);
        assert_eq!(fs::read_to_string(&artifact.output_path).unwrap(), "original");
        assert_eq!(scratch_entries(&s.scratch_root), 0);
    }

    #[test]
    fn test_render_directory_at_artifact_path_fails_publish() {
        let s = setup();
        let invoker = RenderInvoker::new(Box::new(TitleRenderer::new(&["x.svg"])), &s.scratch_root);
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));
        fs::create_dir_all(&artifact.output_path).unwrap();

        let err = invoker.render("A -> B", &artifact).unwrap_err();

        assert_eq!(err.step(), RenderStep::Publish);
        assert!(matches!(err.kind, RenderErrorKind::Publish(ref e) if e.kind() == io::ErrorKind::AlreadyExists));
        assert!(artifact.output_path.is_dir());
        assert!(!artifact.exists());
        let scratch = err.scratch.expect("scratch path reported");
        assert!(scratch.join("out/x.svg").is_file());
    }

    #[test]
    fn test_render_scratch_root_unwritable() {
        let s = setup();
        // A file where the scratch root should be.
        fs::create_dir_all(s.scratch_root.parent().unwrap()).unwrap();
        fs::write(&s.scratch_root, "not a directory").unwrap();
        let invoker = RenderInvoker::new(Box::new(TitleRenderer::new(&["x.svg"])), &s.scratch_root);
        let artifact = s.cache.resolve("guide", &Fingerprint::of("A -> B"));

        let err = invoker.render("A -> B", &artifact).unwrap_err();
        assert_eq!(err.step(), RenderStep::Scratch);
        assert!(err.scratch.is_none());
    }
}
