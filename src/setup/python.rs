//! Python interpreter discovery and probes

use super::installer::{CommandOutput, CommandRunner, RunOptions};
use super::requirements::PyVersion;
use super::ModuleProbe;
use crate::common::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const VERSION_SNIPPET: &str = "import sys; print('%d.%d' % sys.version_info[:2])";

pub(crate) const VENV_SNIPPET: &str = "import sys; sys.exit(0 if hasattr(sys, 'real_prefix') \
     or sys.prefix != getattr(sys, 'base_prefix', sys.prefix) else 1)";

// The module name arrives as argv[1] and is never spliced into code.
pub(crate) const IMPORT_SNIPPET: &str = "import sys; __import__(sys.argv[1])";

/// A Python interpreter and the runner used to talk to it
#[derive(Clone)]
pub struct Interpreter {
    path: PathBuf,
    runner: Arc<dyn CommandRunner>,
    probe_timeout: Option<Duration>,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("path", &self.path)
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

impl Interpreter {
    pub fn new(
        path: PathBuf,
        runner: Arc<dyn CommandRunner>,
        probe_timeout: Option<Duration>,
    ) -> Self {
        Self {
            path,
            runner,
            probe_timeout,
        }
    }

    /// Find an interpreter: `explicit` if given, else `python3` then `python` on PATH
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.components().count() > 1 {
                return if path.exists() {
                    Ok(path.to_path_buf())
                } else {
                    Err(Error::InterpreterNotFound(path.display().to_string()))
                };
            }
            return which::which(path)
                .map_err(|_| Error::InterpreterNotFound(path.display().to_string()));
        }

        for cmd in ["python3", "python"] {
            if let Ok(path) = which::which(cmd) {
                return Ok(path);
            }
        }

        Err(Error::InterpreterNotFound(
            "neither python3 nor python is on PATH; pass --python".to_string(),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    async fn run_snippet(&self, snippet: &str, extra: &[&str]) -> Result<CommandOutput> {
        let mut args = vec!["-c".to_string(), snippet.to_string()];
        args.extend(extra.iter().map(|s| s.to_string()));
        self.runner
            .run(&self.path, &args, &RunOptions::captured(self.probe_timeout))
            .await
    }

    /// `major.minor` of the interpreter
    pub async fn version(&self) -> Result<PyVersion> {
        let output = self.run_snippet(VERSION_SNIPPET, &[]).await?;
        if !output.success() {
            return Err(Error::command_failed(&self.path, output.stderr.trim()));
        }
        output.stdout.parse()
    }

    /// Whether the interpreter runs inside an isolated environment
    pub async fn is_virtual_env(&self) -> Result<bool> {
        Ok(self.run_snippet(VENV_SNIPPET, &[]).await?.success())
    }
}

#[async_trait]
impl ModuleProbe for Interpreter {
    async fn is_importable(&self, name: &str) -> Result<bool> {
        let output = self.run_snippet(IMPORT_SNIPPET, &[name]).await?;
        tracing::debug!(module = name, importable = output.success(), "import probe");
        Ok(output.success())
    }
}
