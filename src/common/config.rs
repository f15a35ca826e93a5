//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Interpreter settings
    #[serde(default)]
    pub python: PythonConfig,

    /// Dependency installer settings
    #[serde(default)]
    pub installer: InstallerConfig,

    /// Test module discovery rules
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Report settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Interpreter settings
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PythonConfig {
    /// Explicit interpreter path; `python3`/`python` on PATH otherwise
    pub interpreter: Option<PathBuf>,
}

/// Installer settings
#[derive(Debug, Deserialize, Clone)]
pub struct InstallerConfig {
    /// Where the installer bootstrap script is fetched from
    #[serde(default = "default_bootstrap_url")]
    pub bootstrap_url: String,

    /// Verify TLS certificates when fetching the bootstrap script
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Honour `HTTP(S)_PROXY` settings for the download
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,

    /// Requirements appended to the version-keyed table (`name[==version]`)
    #[serde(default)]
    pub extra_requirements: Vec<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            bootstrap_url: default_bootstrap_url(),
            verify_tls: default_verify_tls(),
            use_proxy: default_use_proxy(),
            extra_requirements: Vec::new(),
        }
    }
}

fn default_bootstrap_url() -> String {
    "https://bootstrap.pypa.io/get-pip.py".to_string()
}

fn default_verify_tls() -> bool {
    true
}

fn default_use_proxy() -> bool {
    true
}

/// Discovery rules
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Filename prefix a test module must have
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Filename suffix a test module must have
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Filename prefix of long-running modules left out of the suite
    #[serde(default = "default_exclude_prefix")]
    pub exclude_prefix: String,

    /// Dotted namespace for qualified names; derived from package markers if unset
    pub namespace: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            suffix: default_suffix(),
            exclude_prefix: default_exclude_prefix(),
            namespace: None,
        }
    }
}

fn default_prefix() -> String {
    "test_".to_string()
}
fn default_suffix() -> String {
    ".py".to_string()
}
fn default_exclude_prefix() -> String {
    "test_memory_leaks".to_string()
}

/// Report settings
#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// 0 = summary only, 1 = one character per test, 2 = one line per test
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            verbosity: default_verbosity(),
        }
    }
}

fn default_verbosity() -> u8 {
    2
}

/// Timeout settings in seconds; 0 disables the timeout
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Bootstrap script download
    #[serde(default = "default_download")]
    pub download_secs: u64,

    /// Installer subprocesses
    #[serde(default = "default_install")]
    pub install_secs: u64,

    /// Interpreter probes (version, venv, imports, test listing)
    #[serde(default = "default_probe")]
    pub probe_secs: u64,

    /// A single test unit
    #[serde(default = "default_test")]
    pub test_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            download_secs: default_download(),
            install_secs: default_install(),
            probe_secs: default_probe(),
            test_secs: default_test(),
        }
    }
}

fn default_download() -> u64 {
    60
}
fn default_install() -> u64 {
    600
}
fn default_probe() -> u64 {
    30
}
fn default_test() -> u64 {
    300
}

/// Convert a seconds setting into an optional timeout
pub fn as_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    /// Load configuration from `path`, or from the default config file
    ///
    /// Returns default configuration if no file exists. An explicitly given
    /// path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        if config.runner.verbosity > 2 {
            return Err(super::Error::Config(format!(
                "runner.verbosity must be 0, 1 or 2 (got {})",
                config.runner.verbosity
            )));
        }
        Ok(config)
    }
}
