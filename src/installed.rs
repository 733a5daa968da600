//! Installed package scanner
//!
//! Reads the `dbt_project.yml` of every package materialised by `dbt deps`
//! under the project's install path (`packages-install-path`, default
//! `dbt_packages`). Packages' own `integration_tests` projects are skipped.

use crate::domain::{InstalledFact, VersionSpecifier};
use crate::manifest::version_strings;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Install directory used when the project does not set one
pub const DEFAULT_INSTALL_PATH: &str = "dbt_packages";

const PROJECT_FILE: &str = "dbt_project.yml";

/// Resolves the project's package install directory
pub fn packages_install_path(root: &Path) -> PathBuf {
    let project_file = root.join(PROJECT_FILE);
    let configured = match fs::read_to_string(&project_file) {
        Ok(content) => match serde_yaml::from_str::<Value>(&content) {
            Ok(doc) => doc
                .get("packages-install-path")
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                warn!(path = %project_file.display(), error = %e, "failed to parse dbt_project.yml, using default install path");
                None
            }
        },
        Err(_) => {
            debug!(path = %project_file.display(), "no dbt_project.yml, using default install path");
            None
        }
    };
    root.join(configured.as_deref().unwrap_or(DEFAULT_INSTALL_PATH))
}

/// Finds every installed package's `dbt_project.yml`, sorted by path
pub fn find_package_project_files(install_dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    collect_project_files(install_dir, &mut found);
    found.sort();
    found
}

fn collect_project_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if name == "integration_tests" || name.starts_with('.') {
                continue;
            }
            collect_project_files(&path, found);
        } else if name == PROJECT_FILE {
            found.push(path);
        }
    }
}

/// Reads one installed package's metadata
///
/// Returns `None` (with a warning) if the file is unreadable or lacks a
/// `name` or `version`.
pub fn parse_installed_package(path: &Path) -> Option<InstalledFact> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read installed package");
            return None;
        }
    };
    let doc: Value = match serde_yaml::from_str(&content) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse installed package");
            return None;
        }
    };

    let Some(name) = doc.get("name").and_then(Value::as_str) else {
        warn!(path = %path.display(), "installed package has no name");
        return None;
    };
    let Some(raw_version) = doc
        .get("version")
        .and_then(version_strings)
        .and_then(|v| v.into_iter().next())
    else {
        warn!(package = name, path = %path.display(), "installed package has no version");
        return None;
    };

    let version = match VersionSpecifier::parse(&raw_version) {
        Ok(version) => Some(version),
        Err(e) => {
            warn!(package = name, error = %e, "installed package version is not semver");
            None
        }
    };
    let require_dbt_version = doc
        .get("require-dbt-version")
        .and_then(version_strings)
        .unwrap_or_default();

    Some(InstalledFact::new(name, version, require_dbt_version))
}

/// Scans the project's installed packages, keyed by package name
///
/// An empty result is valid: every dependency then reports `unknown`.
pub fn scan_installed_packages(root: &Path) -> HashMap<String, InstalledFact> {
    let install_dir = packages_install_path(root);
    let mut installed = HashMap::new();

    for path in find_package_project_files(&install_dir) {
        let Some(fact) = parse_installed_package(&path) else {
            continue;
        };
        if installed.contains_key(&fact.name) {
            debug!(package = %fact.name, path = %path.display(), "package installed twice, keeping first");
            continue;
        }
        installed.insert(fact.name.clone(), fact);
    }

    if installed.is_empty() {
        warn!(path = %install_dir.display(), "no installed packages found, run `dbt deps` first for installed versions");
    }
    installed
}
