//! Test discovery, suite assembly and execution
//!
//! Modules in one directory are discovered by file name, loaded into a
//! single collection, and run sequentially as one suite.

pub mod discovery;
pub mod python;
pub mod runner;
pub mod suite;

pub use discovery::{discover, DiscoveryRules, ModuleRef};
pub use runner::{run, run_with_output, RunResult};
pub use suite::{build_suite, ModuleLoader, TestCollection, TestUnit, UnitOutcome, UnitStatus};
