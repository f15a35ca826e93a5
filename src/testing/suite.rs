//! Suite construction
//!
//! Resolves every discovered module into its runnable tests and collects
//! them into one [`TestCollection`]. A module that fails to load aborts the
//! whole build.

use super::discovery::{discover, DiscoveryRules, ModuleRef};
use crate::common::Result;
use async_trait::async_trait;
use std::path::Path;

/// How a single test unit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Passed,
    Failed,
    Errored,
    Skipped,
}

/// Status plus whatever the unit reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub status: UnitStatus,
    /// Failure traceback or skip reason
    pub detail: Option<String>,
}

impl UnitOutcome {
    pub fn passed() -> Self {
        Self {
            status: UnitStatus::Passed,
            detail: None,
        }
    }

    pub fn with_detail(status: UnitStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: Some(detail.into()),
        }
    }
}

/// One runnable test
#[async_trait]
pub trait TestUnit: Send + Sync {
    /// Fully-qualified test id, e.g. `psutil.tests.test_system.TestCase.test_x`
    fn id(&self) -> &str;

    /// Run the test to completion
    async fn run(&self) -> UnitOutcome;
}

/// Turns a module reference into its runnable tests
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Load every test unit the module defines
    async fn load(&self, module: &ModuleRef) -> Result<Vec<Box<dyn TestUnit>>>;
}

/// Ordered aggregation of loaded test units
#[derive(Default)]
pub struct TestCollection {
    units: Vec<Box<dyn TestUnit>>,
}

impl TestCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tests` after everything already collected
    pub fn add_tests(&mut self, tests: impl IntoIterator<Item = Box<dyn TestUnit>>) {
        self.units.extend(tests);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Box<dyn TestUnit>> {
        self.units.iter()
    }

    /// Test ids in collection order
    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|u| u.id()).collect()
    }
}

impl std::fmt::Debug for TestCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCollection")
            .field("units", &self.ids())
            .finish()
    }
}

/// Discover the modules in `dir` and load them all into one collection
pub async fn build_suite(
    dir: &Path,
    rules: &DiscoveryRules,
    namespace: &str,
    loader: &dyn ModuleLoader,
) -> Result<TestCollection> {
    let mut collection = TestCollection::new();
    let mut modules = 0usize;

    for module in discover(dir, rules, namespace)? {
        let module = module?;
        let tests = loader.load(&module).await?;
        tracing::debug!(module = %module.qualified_name, tests = tests.len(), "loaded");
        collection.add_tests(tests);
        modules += 1;
    }

    tracing::info!(modules, tests = collection.len(), "suite built");
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use tempfile::tempdir;

    struct Named(String);

    #[async_trait]
    impl TestUnit for Named {
        fn id(&self) -> &str {
            &self.0
        }

        async fn run(&self) -> UnitOutcome {
            UnitOutcome::passed()
        }
    }

    /// Two tests per module; modules named `*broken*` fail to load
    struct TwoPerModule;

    #[async_trait]
    impl ModuleLoader for TwoPerModule {
        async fn load(&self, module: &ModuleRef) -> Result<Vec<Box<dyn TestUnit>>> {
            if module.qualified_name.contains("broken") {
                return Err(Error::module_load(&module.qualified_name, "SyntaxError"));
            }
            Ok(["test_one", "test_two"]
                .iter()
                .map(|t| {
                    Box::new(Named(format!("{}.{}", module.qualified_name, t))) as Box<dyn TestUnit>
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_empty_directory_yields_empty_collection() {
        let dir = tempdir().unwrap();
        let suite = build_suite(dir.path(), &DiscoveryRules::default(), "pkg", &TwoPerModule)
            .await
            .unwrap();
        assert!(suite.is_empty());
    }

    #[tokio::test]
    async fn test_units_keep_qualified_names() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("test_cpu.py"), "").unwrap();

        let suite = build_suite(dir.path(), &DiscoveryRules::default(), "pkg.tests", &TwoPerModule)
            .await
            .unwrap();
        assert_eq!(
            suite.ids(),
            ["pkg.tests.test_cpu.test_one", "pkg.tests.test_cpu.test_two"]
        );
    }

    #[tokio::test]
    async fn test_load_failure_aborts_build() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("test_ok.py"), "").unwrap();
        std::fs::write(dir.path().join("test_broken.py"), "").unwrap();

        let err = build_suite(dir.path(), &DiscoveryRules::default(), "", &TwoPerModule)
            .await
            .unwrap_err();
        match err {
            Error::ModuleLoad { module, .. } => assert_eq!(module, "test_broken"),
            other => panic!("Expected ModuleLoad, got {other:?}"),
        }
    }
}
