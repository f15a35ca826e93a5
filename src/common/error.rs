//! Error types for the suite runner
//!
//! Messages are meant to be read by a person at a terminal, so the ones a
//! user can act on carry a hint on how to resolve them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the suite runner
#[derive(Error, Debug)]
pub enum Error {
    // === Dependency Errors ===
    #[error("{requirement:?} lib is not installed; run:\n{hint}")]
    MissingDependency { requirement: String, hint: String },

    #[error("{step} exited with code {code}")]
    InstallFailed { step: String, code: i32 },

    #[error("Invalid requirement '{0}': package name must not be empty")]
    InvalidRequirement(String),

    #[error("Python interpreter not found: {0}")]
    InterpreterNotFound(String),

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    // === Discovery / Suite Errors ===
    #[error("Cannot list test directory '{}': {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to load test module '{module}': {reason}")]
    ModuleLoad { module: String, reason: String },

    // === Subprocess Errors ===
    #[error("Failed to run '{program}': {reason}")]
    CommandFailed { program: String, reason: String },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a module load error
    pub fn module_load(module: &str, reason: impl Into<String>) -> Self {
        Self::ModuleLoad {
            module: module.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a command failed error
    pub fn command_failed(program: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::CommandFailed {
            program: program.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a download error
    pub fn download(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
