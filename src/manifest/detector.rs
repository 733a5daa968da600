//! Manifest file detection
//!
//! Features:
//! - Finds packages.yml and dependencies.yml anywhere under the project root
//! - Skips hidden directories, build output and installed packages
//! - Enforces a single effective manifest per project

use crate::domain::ManifestKind;
use crate::error::ManifestError;
use crate::installed::packages_install_path;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directories that never hold the project's own manifest
const SKIPPED_DIRS: &[&str] = &["target", "logs", "dbt_packages", "dbt_internal_packages"];

/// Information about a detected manifest file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Format of the manifest
    pub kind: ManifestKind,
}

impl ManifestInfo {
    /// Create a new ManifestInfo
    pub fn new(path: impl Into<PathBuf>, kind: ManifestKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Find every candidate manifest under `root`, sorted by path
pub fn find_manifest_files(root: &Path) -> Vec<ManifestInfo> {
    let install_dir = packages_install_path(root);
    let mut found = Vec::new();
    walk(root, &install_dir, &mut found);
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

fn walk(dir: &Path, install_dir: &Path, found: &mut Vec<ManifestInfo>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        // Symlinked directories are not followed; they may point back into the project
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if name.starts_with('.') || SKIPPED_DIRS.contains(&&*name) || path == install_dir {
                continue;
            }
            walk(&path, install_dir, found);
        } else if let Some(kind) = ManifestKind::from_filename(&name) {
            found.push(ManifestInfo::new(path, kind));
        }
    }
}

/// Reduce the candidates to the one manifest to use
///
/// - none: [`ManifestError::NotFound`]
/// - two or more of the same format: [`ManifestError::DuplicateManifest`]
/// - one of each format: dependencies.yml wins and the discard is logged
pub fn select_manifest(
    root: &Path,
    candidates: Vec<ManifestInfo>,
) -> Result<ManifestInfo, ManifestError> {
    let (current, legacy): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|m| m.kind.is_current_format());

    for group in [&current, &legacy] {
        if group.len() > 1 {
            return Err(ManifestError::DuplicateManifest {
                file_name: group[0].kind.manifest_filename(),
                paths: group.iter().map(|m| m.path.clone()).collect(),
            });
        }
    }

    match (current.into_iter().next(), legacy.into_iter().next()) {
        (Some(current), Some(legacy)) => {
            warn!(
                using = %current.path.display(),
                ignored = %legacy.path.display(),
                "found both dependencies.yml and packages.yml, ignoring packages.yml"
            );
            Ok(current)
        }
        (Some(only), None) | (None, Some(only)) => Ok(only),
        (None, None) => Err(ManifestError::not_found(root)),
    }
}

/// Find and select the project's manifest
pub fn detect_manifest(root: &Path) -> Result<ManifestInfo, ManifestError> {
    select_manifest(root, find_manifest_files(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "packages: []\n").unwrap();
    }

    #[test]
    fn test_find_in_root() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("packages.yml"));

        let found = find_manifest_files(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ManifestKind::Packages);
    }

    #[test]
    fn test_find_skips_installed_and_hidden() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("dependencies.yml"));
        touch(&dir.path().join("dbt_packages/dbt_utils/packages.yml"));
        touch(&dir.path().join(".venv/lib/packages.yml"));
        touch(&dir.path().join("target/packages.yml"));

        let found = find_manifest_files(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ManifestKind::Dependencies);
    }

    #[test]
    fn test_find_skips_custom_install_path() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("dbt_project.yml"),
            "name: proj\npackages-install-path: vendor\n",
        )
        .unwrap();
        touch(&dir.path().join("packages.yml"));
        touch(&dir.path().join("vendor/some_pkg/packages.yml"));

        assert_eq!(find_manifest_files(dir.path()).len(), 1);
    }

    #[test]
    fn test_find_nested() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("transform/packages.yml"));
        let found = find_manifest_files(dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("transform/packages.yml"));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_does_not_follow_symlinked_dirs() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("packages.yml"));
        fs::create_dir_all(dir.path().join("models")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("models/project_root")).unwrap();

        let found = find_manifest_files(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, dir.path().join("packages.yml"));
        assert!(detect_manifest(dir.path()).is_ok());
    }

    #[test]
    fn test_select_none_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = detect_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }

    #[test]
    fn test_select_duplicate_same_kind_is_fatal() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("packages.yml"));
        touch(&dir.path().join("sub/packages.yml"));

        let err = detect_manifest(dir.path()).unwrap_err();
        match err {
            ManifestError::DuplicateManifest { file_name, paths } => {
                assert_eq!(file_name, "packages.yml");
                assert_eq!(paths.len(), 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_select_prefers_dependencies_yml() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("packages.yml"));
        touch(&dir.path().join("dependencies.yml"));

        let selected = detect_manifest(dir.path()).unwrap();
        assert_eq!(selected.kind, ManifestKind::Dependencies);
    }

    #[test]
    fn test_select_duplicate_current_with_legacy_is_fatal() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("packages.yml"));
        touch(&dir.path().join("dependencies.yml"));
        touch(&dir.path().join("nested/dependencies.yml"));

        assert!(matches!(
            detect_manifest(dir.path()),
            Err(ManifestError::DuplicateManifest { .. })
        ));
    }
}
