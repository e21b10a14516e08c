//! External renderer abstraction.
//!
//! [`Renderer`] is the seam between the invoker and whatever actually draws
//! the diagram. [`CommandRenderer`] runs an external program such as
//! `java -jar plantuml.jar -tsvg -o <dir> <input>`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::consts::{DEFAULT_TIMEOUT, POLL_INTERVAL};
use crate::error::{InvokeError, PreconditionError};

/// Something that turns a diagram source file into output files.
///
/// Implementations write zero or more files into `output_dir` and may name
/// them however they like; the caller discovers them afterwards.
pub trait Renderer: Send + Sync {
    /// Render `input` into `output_dir`.
    fn render(&self, input: &Path, output_dir: &Path) -> Result<(), InvokeError>;

    /// Check that the renderer can run at all.
    ///
    /// Called once before any document is processed.
    fn check(&self) -> Result<(), PreconditionError> {
        Ok(())
    }
}

/// Renderer backed by an external program.
///
/// The command line is
/// `{program} [-jar {jar}] {args...} {output_flag} {output_dir} {input}`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    jar: Option<PathBuf>,
    args: Vec<String>,
    output_flag: String,
    timeout: Duration,
}

impl CommandRenderer {
    /// Create a renderer that runs `program`.
    ///
    /// Defaults: no jar, no extra arguments, `-o` as output flag and a
    /// 60 second timeout.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            jar: None,
            args: Vec::new(),
            output_flag: "-o".to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// PlantUML through `java -jar {jar} -tsvg`.
    #[must_use]
    pub fn plantuml(jar: impl Into<PathBuf>) -> Self {
        Self::new("java").jar(jar).args(["-tsvg"])
    }

    /// Run the program with `-jar {jar}`.
    #[must_use]
    pub fn jar(mut self, jar: impl Into<PathBuf>) -> Self {
        self.jar = Some(jar.into());
        self
    }

    /// Extra arguments placed before the output flag.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Flag that introduces the output directory.
    #[must_use]
    pub fn output_flag(mut self, flag: impl Into<String>) -> Self {
        self.output_flag = flag.into();
        self
    }

    /// Maximum time one invocation may run before it is killed.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, input: &Path, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(jar) = &self.jar {
            cmd.arg("-jar").arg(jar);
        }
        cmd.args(&self.args)
            .arg(&self.output_flag)
            .arg(output_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, input: &Path, output_dir: &Path) -> Result<(), InvokeError> {
        let mut child = self
            .command(input, output_dir)
            .spawn()
            .map_err(InvokeError::Spawn)?;

        // Drain stderr on a separate thread so a chatty renderer cannot fill
        // the pipe and stall while we poll for exit.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });
        let collect_stderr =
            |reader: Option<thread::JoinHandle<String>>| reader.and_then(|h| h.join().ok());

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        // The reader is left detached: a grandchild may
                        // still hold the pipe open.
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(InvokeError::Timeout(self.timeout));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(InvokeError::Wait(e));
                }
            }
        };

        let stderr = collect_stderr(stderr_reader).unwrap_or_default();
        tracing::debug!(
            program = %self.program,
            input = %input.display(),
            elapsed_ms = start.elapsed().as_millis(),
            code = ?status.code(),
            "renderer finished"
        );

        if status.success() {
            Ok(())
        } else {
            Err(InvokeError::Exit {
                code: status.code(),
                stderr,
            })
        }
    }

    fn check(&self) -> Result<(), PreconditionError> {
        let resolved =
            which::which(&self.program).map_err(|source| PreconditionError::ProgramNotFound {
                program: self.program.clone(),
                source,
            })?;
        tracing::debug!(program = %resolved.display(), "renderer program found");

        if let Some(jar) = &self.jar
            && !jar.is_file()
        {
            return Err(PreconditionError::JarNotFound(jar.clone()));
        }
        Ok(())
    }
}
