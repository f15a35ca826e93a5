//! Test module discovery
//!
//! Lists one directory (no recursion) and keeps the entries whose file
//! names follow the test-module naming convention. Order is whatever the
//! directory listing yields; it is not sorted.

use crate::common::config::DiscoveryConfig;
use crate::common::{Error, Result};
use std::fs::{DirEntry, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

/// Naming convention for test modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRules {
    pub prefix: String,
    pub suffix: String,
    pub exclude_prefix: String,
}

impl Default for DiscoveryRules {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

impl From<&DiscoveryConfig> for DiscoveryRules {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            suffix: config.suffix.clone(),
            exclude_prefix: config.exclude_prefix.clone(),
        }
    }
}

impl DiscoveryRules {
    /// Whether `file_name` names a test module
    pub fn accepts(&self, file_name: &str) -> bool {
        file_name.len() > self.prefix.len() + self.suffix.len()
            && file_name.starts_with(&self.prefix)
            && file_name.ends_with(&self.suffix)
            && (self.exclude_prefix.is_empty() || !file_name.starts_with(&self.exclude_prefix))
    }
}

/// A discovered, loadable test module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    /// File name inside the discovery directory
    pub file_name: String,
    /// Path to the module file
    pub path: PathBuf,
    /// Namespace-qualified module name, e.g. `psutil.tests.test_system`
    pub qualified_name: String,
}

/// Lazy iterator over the test modules of one directory
#[derive(Debug)]
pub struct Discovery {
    dir: PathBuf,
    entries: ReadDir,
    rules: DiscoveryRules,
    namespace: String,
}

impl Discovery {
    /// Map one listing entry to a module, `None` when it is not a test module
    fn module_for(&self, entry: io::Result<DirEntry>) -> Result<Option<ModuleRef>> {
        let entry = entry.map_err(|source| Error::Discovery {
            path: self.dir.clone(),
            source,
        })?;
        let file_type = entry.file_type().map_err(|source| Error::Discovery {
            path: entry.path(),
            source,
        })?;
        if file_type.is_dir() {
            return Ok(None);
        }

        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            return Ok(None);
        };

        if !self.rules.accepts(&file_name) {
            tracing::trace!(file = %file_name, "not a test module");
            return Ok(None);
        }

        let stem = &file_name[..file_name.len() - self.rules.suffix.len()];
        let qualified_name = if self.namespace.is_empty() {
            stem.to_string()
        } else {
            format!("{}.{}", self.namespace, stem)
        };
        tracing::debug!(module = %qualified_name, "discovered test module");

        Ok(Some(ModuleRef {
            path: entry.path(),
            file_name,
            qualified_name,
        }))
    }
}

impl Iterator for Discovery {
    type Item = Result<ModuleRef>;

    fn next(&mut self) -> Option<Result<ModuleRef>> {
        loop {
            let entry = self.entries.next()?;
            match self.module_for(entry) {
                Ok(None) => continue,
                Ok(Some(module)) => return Some(Ok(module)),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Start a discovery pass over `dir`.
///
/// Each call lists the directory afresh. Failing to open the directory, or
/// to read any entry of it, is an error.
pub fn discover(dir: &Path, rules: &DiscoveryRules, namespace: &str) -> Result<Discovery> {
    let entries = std::fs::read_dir(dir).map_err(|source| Error::Discovery {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(Discovery {
        dir: dir.to_path_buf(),
        entries,
        rules: rules.clone(),
        namespace: namespace.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "").unwrap();
    }

    fn names(discovery: Discovery) -> BTreeSet<String> {
        discovery.map(|m| m.unwrap().qualified_name).collect()
    }

    #[test]
    fn test_filters_by_convention() {
        let dir = tempdir().unwrap();
        for name in ["test_foo.py", "test_memory_leaks.py", "helper.py", "test_.py"] {
            touch(dir.path(), name);
        }

        let found = names(discover(dir.path(), &DiscoveryRules::default(), "").unwrap());
        assert_eq!(found, BTreeSet::from(["test_foo".to_string()]));
    }

    #[test]
    fn test_qualifies_with_namespace() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "test_system.py");

        let modules: Vec<_> = discover(dir.path(), &DiscoveryRules::default(), "psutil.tests")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].qualified_name, "psutil.tests.test_system");
        assert_eq!(modules[0].file_name, "test_system.py");
    }

    #[test]
    fn test_no_recursion_and_no_directories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("test_dir.py")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub"), "test_nested.py");

        assert!(names(discover(dir.path(), &DiscoveryRules::default(), "").unwrap()).is_empty());
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        assert_eq!(discover(dir.path(), &DiscoveryRules::default(), "").unwrap().count(), 0);
    }

    #[test]
    fn test_restartable() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "test_a.py");
        let rules = DiscoveryRules::default();

        assert_eq!(discover(dir.path(), &rules, "").unwrap().count(), 1);
        touch(dir.path(), "test_b.py");
        assert_eq!(discover(dir.path(), &rules, "").unwrap().count(), 2);
    }

    #[test]
    fn test_unreadable_entry_is_error() {
        let dir = tempdir().unwrap();
        let discovery = discover(dir.path(), &DiscoveryRules::default(), "").unwrap();

        let err = discovery
            .module_for(Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")))
            .unwrap_err();
        match err {
            Error::Discovery { path, source } => {
                assert_eq!(path, dir.path());
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("Expected Discovery error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_directory_is_error() {
        let err = discover(Path::new("/no/such/tests"), &DiscoveryRules::default(), "").unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
    }

    #[test]
    fn test_custom_rules() {
        let rules = DiscoveryRules {
            prefix: "check_".to_string(),
            suffix: ".sh".to_string(),
            exclude_prefix: String::new(),
        };
        assert!(rules.accepts("check_disk.sh"));
        assert!(!rules.accepts("check_.sh"));
        assert!(!rules.accepts("test_disk.py"));
    }
}
