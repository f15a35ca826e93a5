//! Configuration paths and Python package layout helpers

use std::path::{Path, PathBuf};

/// Name used for the configuration directory
const APP_NAME: &str = "suiterun";

/// Marker file that turns a directory into a Python package
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/suiterun/`
/// - macOS: `~/Library/Application Support/suiterun/`
/// - Windows: `%APPDATA%\suiterun\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Whether `dir` is a Python package
pub fn is_package(dir: &Path) -> bool {
    dir.join(PACKAGE_MARKER).is_file()
}

/// Split a test directory into its import root and dotted namespace.
///
/// Walks up from `dir` while each directory is a package. The first
/// non-package ancestor is the import root. A directory that is not a
/// package is its own import root with an empty namespace.
pub fn package_layout(dir: &Path) -> (PathBuf, String) {
    let mut parts = Vec::new();
    let mut current = dir.to_path_buf();

    while is_package(&current) {
        let Some(name) = current.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            break;
        };
        parts.push(name);
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    parts.reverse();
    (current, parts.join("."))
}
