//! Package identity as used in manifests and the knowledge base

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique key of a declared package
///
/// Public packages are `namespace/name` (e.g. `dbt-labs/dbt_utils`). Private
/// packages are keyed by their source reference (git URL, local path or
/// tarball URL), which is unique within one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Creates an identity from its string form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds `namespace/name`
    pub fn from_parts(namespace: &str, name: &str) -> Self {
        Self(format!("{}/{}", namespace, name))
    }

    /// The identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the first `/`, if any
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once('/').map(|(ns, _)| ns)
    }

    /// Part after the last `/`, without a trailing `.git`
    ///
    /// For hub packages this is the package's project name as long as the
    /// hub name matches the name in its `dbt_project.yml`.
    pub fn name(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
        last.strip_suffix(".git").unwrap_or(last)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
