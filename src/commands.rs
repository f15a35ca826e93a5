//! CLI argument definitions
//!
//! Defines the clap options for the suite runner.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct Options {
    /// Install test dependencies instead of running the tests
    #[arg(short = 'i', long)]
    pub install_deps: bool,

    /// Directory holding the test modules
    #[arg(short = 'd', long, default_value = ".")]
    pub dir: PathBuf,

    /// Python interpreter to use (default: python3, then python, on PATH)
    #[arg(long)]
    pub python: Option<PathBuf>,

    /// Dotted namespace for test ids (default: derived from __init__.py files)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Report verbosity: 0 summary only, 1 dots, 2 one line per test
    #[arg(short = 'v', long, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub verbosity: Option<u8>,

    /// Configuration file (default: platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip TLS certificate verification when downloading the pip bootstrap
    #[arg(long)]
    pub insecure_bootstrap: bool,
}
