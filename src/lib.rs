//! suiterun - a test-orchestration entry point
//!
//! Discovers test modules in a directory, optionally provisions missing
//! test dependencies, and runs everything as one aggregated suite whose
//! outcome becomes the process exit status.

pub mod cli;
pub mod commands;
pub mod common;
pub mod setup;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
