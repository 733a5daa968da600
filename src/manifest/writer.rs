//! Manifest file writing and update operations
//!
//! This module provides:
//! - ManifestWriter for applying upgraded versions to the manifest
//! - Dry-run mode support (changes are computed and reported, not written)
//! - Per-package error handling with graceful continuation

use crate::domain::PackageUpgradeResult;
use crate::error::ManifestError;
use crate::manifest::get_parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writer for manifest files that applies version updates
pub struct ManifestWriter {
    /// Whether to run in dry-run mode (no file modifications)
    dry_run: bool,
}

/// One rewritten `version:` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineChange {
    /// Package whose version was rewritten
    pub package: String,
    /// Lines replaced
    pub removed: Vec<String>,
    /// Line written in their place
    pub added: String,
}

/// Result of applying updates to a manifest file
#[derive(Debug)]
pub struct WriteResult {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Number of updates successfully applied
    pub updates_applied: usize,
    /// Number of updates that failed
    pub updates_failed: usize,
    /// Whether the file was actually modified
    pub file_modified: bool,
    /// Errors encountered during update
    pub errors: Vec<String>,
    /// Changed lines, in application order
    pub changes: Vec<LineChange>,
}

impl WriteResult {
    /// Create a new WriteResult
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            updates_applied: 0,
            updates_failed: 0,
            file_modified: false,
            errors: Vec::new(),
            changes: Vec::new(),
        }
    }

    /// Returns true if any errors occurred
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl ManifestWriter {
    /// Create a new ManifestWriter
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Rewrites the declared version of every upgraded package
    ///
    /// The file is read once and written once, and only if something changed.
    pub fn apply_upgrades(&self, summary: &PackageUpgradeResult) -> Result<WriteResult, ManifestError> {
        let path = &summary.file_path;
        let mut result = WriteResult::new(path);
        if !summary.has_upgrades() {
            return Ok(result);
        }

        let parser = get_parser(summary.kind);
        let original = read_manifest(path)?;
        let mut content = original.clone();

        for upgrade in &summary.upgrades {
            let version = upgrade.package_final_version();
            match parser.update_version(path, &content, &upgrade.id, &version) {
                Ok(edit) => {
                    result.updates_applied += 1;
                    if edit.is_noop() {
                        debug!(package = %upgrade.id, version = %version, "declared version already up to date");
                        continue;
                    }
                    result.changes.push(LineChange {
                        package: upgrade.id.to_string(),
                        removed: edit.removed,
                        added: edit.added,
                    });
                    content = edit.content;
                }
                Err(e) => {
                    warn!(package = %upgrade.id, error = %e, "failed to rewrite declared version");
                    result.updates_failed += 1;
                    result
                        .errors
                        .push(format!("Failed to update {}: {}", upgrade.id, e));
                }
            }
        }

        if content != original && !self.dry_run {
            write_manifest(path, &content)?;
            result.file_modified = true;
        }

        Ok(result)
    }
}

/// Read a manifest file content safely
pub fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))
}

/// Write content to a manifest file
pub fn write_manifest(path: &Path, content: &str) -> Result<(), ManifestError> {
    fs::write(path, content).map_err(|e| ManifestError::write_error(path, e))
}
