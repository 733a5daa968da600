//! The two manifest formats a dbt project may declare its packages in

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported dependency manifest formats
///
/// Both carry the same `packages:` list; `dependencies.yml` is the current
/// format and also allows project dependencies, `packages.yml` is legacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    /// Legacy `packages.yml`
    Packages,
    /// Current `dependencies.yml`
    Dependencies,
}

impl ManifestKind {
    /// Returns the file name for this format
    pub fn manifest_filename(&self) -> &'static str {
        match self {
            ManifestKind::Packages => "packages.yml",
            ManifestKind::Dependencies => "dependencies.yml",
        }
    }

    /// Returns the lock file written by `dbt deps` next to the manifest
    pub fn lock_filename(&self) -> &'static str {
        "package-lock.yml"
    }

    /// Returns the display name for this format
    pub fn display_name(&self) -> &'static str {
        match self {
            ManifestKind::Packages => "packages.yml (legacy)",
            ManifestKind::Dependencies => "dependencies.yml",
        }
    }

    /// Returns true for the format preferred when both are present
    pub fn is_current_format(&self) -> bool {
        matches!(self, ManifestKind::Dependencies)
    }

    /// Resolves a file name to its format
    pub fn from_filename(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.manifest_filename() == name)
    }

    /// Returns all supported formats
    pub fn all() -> &'static [ManifestKind] {
        &[ManifestKind::Packages, ManifestKind::Dependencies]
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
