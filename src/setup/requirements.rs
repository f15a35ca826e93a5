//! Test requirements and the interpreter-version requirement table

use crate::common::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A package with an optional exact version pin (`name==version`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Requirement {
    name: String,
    version: Option<String>,
}

impl Requirement {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Name to import when checking presence (version pin stripped)
    pub fn import_name(&self) -> &str {
        &self.name
    }
}

impl FromStr for Requirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, version) = match s.split_once("==") {
            Some((name, version)) => (name.trim(), Some(version.trim())),
            None => (s, None),
        };
        if name.is_empty() {
            return Err(Error::InvalidRequirement(s.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            version: version.filter(|v| !v.is_empty()).map(str::to_string),
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}=={}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// Interpreter `major.minor` version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PyVersion {
    pub major: u32,
    pub minor: u32,
}

impl PyVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for PyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Internal(format!("Unrecognized interpreter version '{}'", s.trim()));
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        Ok(Self { major, minor })
    }
}

impl fmt::Display for PyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Fixed table of test requirements for each interpreter version
fn table(version: PyVersion) -> &'static [&'static str] {
    match (version.major, version.minor) {
        (2, 6) => &["ipaddress", "unittest2", "argparse", "mock==1.0.1"],
        (2, 7) | (3, 0..=2) => &["ipaddress", "mock"],
        (3, 3) => &["ipaddress"],
        _ => &[],
    }
}

/// Requirements for one run, computed once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    items: Vec<Requirement>,
}

impl Requirements {
    /// Resolve the table for `version`, then append `extra`
    pub fn for_version(version: PyVersion, extra: &[String]) -> Result<Self> {
        let mut items = table(version)
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<Requirement>>>()?;
        for spec in extra {
            items.push(spec.parse()?);
        }
        tracing::debug!(%version, count = items.len(), "resolved test requirements");
        Ok(Self { items })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Requirement] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
