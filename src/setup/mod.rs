//! Test dependency provisioning
//!
//! Decides which test requirements are missing and installs them through
//! the interpreter's package installer, bootstrapping the installer first
//! when it is absent.

pub mod installer;
pub mod python;
pub mod requirements;

#[cfg(test)]
pub(crate) mod testing;

use crate::common::config::{as_timeout, InstallerConfig, Timeouts};
use crate::common::Result;
use async_trait::async_trait;
use installer::{download_to, DownloadOptions, RunOptions};
use python::Interpreter;
use requirements::Requirement;
use std::collections::BTreeSet;
use std::time::Duration;

/// Package-import-resolution capability
#[async_trait]
pub trait ModuleProbe: Send + Sync {
    /// Whether `name` can be imported in the test environment
    async fn is_importable(&self, name: &str) -> Result<bool>;
}

/// Return the first requirement whose import name cannot be resolved
pub async fn first_missing<'a>(
    requirements: &'a [Requirement],
    probe: &dyn ModuleProbe,
) -> Result<Option<&'a Requirement>> {
    for requirement in requirements {
        if !probe.is_importable(requirement.import_name()).await? {
            return Ok(Some(requirement));
        }
    }
    Ok(None)
}

/// Installs test requirements for one interpreter
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    interpreter: Interpreter,
    bootstrap_url: String,
    verify_tls: bool,
    use_proxy: bool,
    download_timeout: Option<Duration>,
    install_timeout: Option<Duration>,
}

impl DependencyResolver {
    pub fn new(interpreter: Interpreter, installer: &InstallerConfig, timeouts: &Timeouts) -> Self {
        Self {
            interpreter,
            bootstrap_url: installer.bootstrap_url.clone(),
            verify_tls: installer.verify_tls,
            use_proxy: installer.use_proxy,
            download_timeout: as_timeout(timeouts.download_secs),
            install_timeout: as_timeout(timeouts.install_secs),
        }
    }

    /// Make sure the package installer (pip) is importable.
    ///
    /// Returns `None` when it already is. Otherwise downloads the bootstrap
    /// script into a temporary file, runs it with `--user`, and returns the
    /// script's exit code. The temporary file is removed when this returns,
    /// on success and on error alike.
    pub async fn ensure_installer_present(&self) -> Result<Option<i32>> {
        if self.interpreter.is_importable("pip").await? {
            tracing::debug!("pip already importable");
            return Ok(None);
        }

        let mut script = tempfile::Builder::new()
            .prefix("get-pip-")
            .suffix(".py")
            .tempfile()?;

        println!(
            "downloading {} to {}",
            self.bootstrap_url,
            script.path().display()
        );
        if !self.verify_tls {
            tracing::warn!(
                url = %self.bootstrap_url,
                "TLS certificate verification disabled for bootstrap download"
            );
            println!("  (TLS certificate verification disabled)");
        }

        let opts = DownloadOptions {
            verify_tls: self.verify_tls,
            timeout: self.download_timeout,
            use_proxy: self.use_proxy,
        };
        let bytes = download_to(&self.bootstrap_url, script.as_file_mut(), &opts).await?;
        tracing::debug!(bytes, "bootstrap script downloaded");

        println!("installing pip");
        let args = vec![script.path().display().to_string(), "--user".to_string()];
        let output = self
            .interpreter
            .runner()
            .run(
                self.interpreter.path(),
                &args,
                &RunOptions::inherited(self.install_timeout),
            )
            .await?;

        if !output.success() {
            tracing::warn!(code = output.code, "pip bootstrap failed");
        }
        Ok(Some(output.code))
    }

    /// Install or upgrade `requirements` in one installer call.
    ///
    /// Duplicates are collapsed. An empty set is a no-op returning `None`.
    /// Otherwise returns the installer's exit code, or the bootstrap's exit
    /// code when bootstrapping the installer failed.
    pub async fn install_requirements(&self, requirements: &[Requirement]) -> Result<Option<i32>> {
        let pinned: BTreeSet<String> = requirements.iter().map(|r| r.to_string()).collect();
        if pinned.is_empty() {
            tracing::debug!("no test requirements to install");
            return Ok(None);
        }

        let in_venv = self.interpreter.is_virtual_env().await?;

        if let Some(code) = self.ensure_installer_present().await? {
            if code != 0 {
                return Ok(Some(code));
            }
        }

        let mut args: Vec<String> = ["-m", "pip", "install"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if !in_venv {
            args.push("--user".to_string());
        }
        args.push("--upgrade".to_string());
        args.extend(pinned.iter().cloned());

        println!(
            "installing {}",
            pinned.iter().cloned().collect::<Vec<_>>().join(" ")
        );
        tracing::info!(count = pinned.len(), in_venv, "installing test requirements");

        let output = self
            .interpreter
            .runner()
            .run(
                self.interpreter.path(),
                &args,
                &RunOptions::inherited(self.install_timeout),
            )
            .await?;
        Ok(Some(output.code))
    }
}

#[cfg(test)]
mod tests {
    use super::python::{IMPORT_SNIPPET, VENV_SNIPPET};
    use super::testing::{serve_once, RecordingRunner};
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn resolver(runner: Arc<RecordingRunner>) -> DependencyResolver {
        let py = Interpreter::new(PathBuf::from("/usr/bin/python3"), runner, None);
        DependencyResolver::new(py, &InstallerConfig::default(), &Timeouts::default())
    }

    fn req(s: &str) -> Requirement {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_install_empty_is_noop() {
        let runner = Arc::new(RecordingRunner::new());
        let result = resolver(runner.clone()).install_requirements(&[]).await.unwrap();
        assert_eq!(result, None);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_install_deduplicates() {
        // Not a venv: the probe exits non-zero
        let runner = Arc::new(RecordingRunner::new().exit_for(VENV_SNIPPET, 1));
        let result = resolver(runner.clone())
            .install_requirements(&[req("foo==1.0"), req("foo==1.0")])
            .await
            .unwrap();
        assert_eq!(result, Some(0));

        let installs: Vec<_> = runner
            .calls()
            .into_iter()
            .filter(|c| c.args.first().map(String::as_str) == Some("-m"))
            .collect();
        assert_eq!(installs.len(), 1);
        assert_eq!(
            installs[0].args,
            ["-m", "pip", "install", "--user", "--upgrade", "foo==1.0"]
        );
        assert!(!installs[0].capture);
    }

    #[tokio::test]
    async fn test_install_in_venv_omits_user_flag() {
        let runner = Arc::new(RecordingRunner::new());
        resolver(runner.clone())
            .install_requirements(&[req("mock"), req("ipaddress")])
            .await
            .unwrap();

        let last = runner.calls().pop().unwrap();
        assert_eq!(
            last.args,
            ["-m", "pip", "install", "--upgrade", "ipaddress", "mock"]
        );
    }

    #[tokio::test]
    async fn test_install_failure_code_returned() {
        let runner = Arc::new(RecordingRunner::new().exit_for("--upgrade", 2));
        let result = resolver(runner)
            .install_requirements(&[req("mock")])
            .await
            .unwrap();
        assert_eq!(result, Some(2));
    }

    #[tokio::test]
    async fn test_installer_present_skips_download() {
        let runner = Arc::new(RecordingRunner::new());
        let result = resolver(runner.clone())
            .ensure_installer_present()
            .await
            .unwrap();
        assert_eq!(result, None);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, ["-c", IMPORT_SNIPPET, "pip"]);
    }

    #[tokio::test]
    async fn test_bootstrap_runs_script_and_removes_it() {
        let url = serve_once("print('bootstrap')\n").await;
        let runner = Arc::new(RecordingRunner::new().missing_module("pip"));
        let py = Interpreter::new(PathBuf::from("/usr/bin/python3"), runner.clone(), None);
        let config = InstallerConfig {
            bootstrap_url: url,
            use_proxy: false,
            ..InstallerConfig::default()
        };
        let resolver = DependencyResolver::new(py, &config, &Timeouts::default());

        let result = resolver.ensure_installer_present().await.unwrap();
        assert_eq!(result, Some(0));

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        let bootstrap = &calls[1];
        assert!(bootstrap.args[0].ends_with(".py"));
        assert_eq!(bootstrap.args[1], "--user");
        assert!(bootstrap.first_arg_existed);
        assert!(!std::path::Path::new(&bootstrap.args[0]).exists());
    }

    #[tokio::test]
    async fn test_bootstrap_download_failure_runs_nothing() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let runner = Arc::new(RecordingRunner::new().missing_module("pip"));
        let py = Interpreter::new(PathBuf::from("/usr/bin/python3"), runner.clone(), None);
        let config = InstallerConfig {
            bootstrap_url: format!("http://{}/get-pip.py", addr),
            use_proxy: false,
            ..InstallerConfig::default()
        };
        let resolver = DependencyResolver::new(py, &config, &Timeouts::default());

        let err = resolver.ensure_installer_present().await.unwrap_err();
        assert!(matches!(err, crate::common::Error::Download { .. }));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_first_missing_strips_pin() {
        let runner = Arc::new(RecordingRunner::new().missing_module("mock"));
        let py = Interpreter::new(PathBuf::from("python3"), runner, None);
        let reqs = [req("ipaddress"), req("mock==1.0.1")];

        let missing = first_missing(&reqs, &py).await.unwrap();
        assert_eq!(missing.map(|r| r.to_string()), Some("mock==1.0.1".to_string()));
    }
}
