//! Subprocess and download primitives used by the dependency resolver
//!
//! Subprocesses go through the [`CommandRunner`] trait so the resolver and
//! the unittest loader can be driven by a recording fake in tests.

use crate::common::{Error, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// How a subprocess is launched
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Kill the process after this long
    pub timeout: Option<Duration>,
    /// Capture stdout/stderr instead of inheriting the terminal
    pub capture: bool,
}

impl RunOptions {
    /// Captured output with a timeout
    pub fn captured(timeout: Option<Duration>) -> Self {
        Self {
            capture: true,
            timeout,
            ..Self::default()
        }
    }

    /// Output streamed to the terminal with a timeout
    pub fn inherited(timeout: Option<Duration>) -> Self {
        Self {
            capture: false,
            timeout,
            ..Self::default()
        }
    }
}

/// What a finished subprocess left behind
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code; -1 when terminated by a signal
    pub code: i32,
    /// Captured stdout (empty when inherited)
    pub stdout: String,
    /// Captured stderr (empty when inherited)
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Subprocess-invocation capability
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion
    async fn run(&self, program: &Path, args: &[String], opts: &RunOptions)
        -> Result<CommandOutput>;
}

/// Runs real processes with tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        opts: &RunOptions,
    ) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(dir) = &opts.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &opts.env {
            cmd.env(key, value);
        }

        tracing::debug!(program = %program.display(), ?args, "spawning");

        if opts.capture {
            let output = with_timeout(opts.timeout, cmd.output())
                .await?
                .map_err(|e| Error::command_failed(program, e))?;
            Ok(CommandOutput {
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            let status = with_timeout(opts.timeout, cmd.status())
                .await?
                .map_err(|e| Error::command_failed(program, e))?;
            Ok(CommandOutput {
                code: status.code().unwrap_or(-1),
                ..CommandOutput::default()
            })
        }
    }
}

/// Await `fut`, failing with [`Error::Timeout`] once `limit` has elapsed
pub async fn with_timeout<F: std::future::Future>(
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(limit.as_secs())),
        None => Ok(fut.await),
    }
}

/// Download settings for the installer bootstrap
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Verify TLS certificates
    pub verify_tls: bool,
    /// Whole-request timeout
    pub timeout: Option<Duration>,
    /// Honour proxy settings from the environment
    pub use_proxy: bool,
}

/// Download `url` into `dest` with progress reporting
pub async fn download_to<W: Write>(url: &str, dest: &mut W, opts: &DownloadOptions) -> Result<u64> {
    let mut builder = reqwest::Client::builder().user_agent("suiterun");
    if !opts.verify_tls {
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(limit) = opts.timeout {
        builder = builder.timeout(limit);
    }
    if !opts.use_proxy {
        builder = builder.no_proxy();
    }
    let client = builder.build().map_err(|e| Error::download(url, e))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::download(url, e))?;

    if !response.status().is_success() {
        return Err(Error::download(
            url,
            format!("server returned status {}", response.status()),
        ));
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = (total_size > 0).then(|| {
        let pb = ProgressBar::new(total_size);
        if let Ok(style) =
            ProgressStyle::default_bar().template("  [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    });

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::download(url, e))?;
        dest.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        if let Some(ref pb) = pb {
            pb.set_position(downloaded);
        }
    }
    dest.flush()?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    Ok(downloaded)
}
