//! Upgrade run summary types
//!
//! Groups the per-package decisions of one run by whether they change the
//! manifest.

use super::{ManifestKind, PackageUpgradeRecord, PackageVersionUpgradeResult};
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one run against one manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageUpgradeResult {
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Path to the manifest file
    pub file_path: PathBuf,
    /// Format of the manifest
    pub kind: ManifestKind,
    /// Whether the file was actually modified
    pub upgraded: bool,
    /// Results whose version is (or would be) rewritten
    pub upgrades: Vec<PackageVersionUpgradeResult>,
    /// Every other result, in declaration order
    pub unchanged: Vec<PackageVersionUpgradeResult>,
}

impl PackageUpgradeResult {
    /// Creates an empty result for a manifest
    pub fn new(file_path: impl Into<PathBuf>, kind: ManifestKind, dry_run: bool) -> Self {
        Self {
            dry_run,
            file_path: file_path.into(),
            kind,
            upgraded: false,
            upgrades: Vec::new(),
            unchanged: Vec::new(),
        }
    }

    /// Adds a decision to the matching bucket
    pub fn add_result(&mut self, result: PackageVersionUpgradeResult) {
        if result.is_upgraded() {
            self.upgrades.push(result);
        } else {
            self.unchanged.push(result);
        }
    }

    /// Returns the number of upgraded packages
    pub fn upgrade_count(&self) -> usize {
        self.upgrades.len()
    }

    /// Returns the number of packages left as they are
    pub fn unchanged_count(&self) -> usize {
        self.unchanged.len()
    }

    /// Returns the total number of packages decided
    pub fn total_packages(&self) -> usize {
        self.upgrades.len() + self.unchanged.len()
    }

    /// Returns true if any package is upgraded
    pub fn has_upgrades(&self) -> bool {
        !self.upgrades.is_empty()
    }

    /// Unchanged packages whose candidate needs `--force-upgrade`
    pub fn forced_candidates(&self) -> impl Iterator<Item = &PackageVersionUpgradeResult> {
        self.unchanged
            .iter()
            .filter(|r| r.version_reason.requires_force() && r.compatible_version.is_some())
    }

    /// Every decision, upgrades first
    pub fn all_results(&self) -> impl Iterator<Item = &PackageVersionUpgradeResult> {
        self.upgrades.iter().chain(self.unchanged.iter())
    }

    /// Records of upgraded packages
    pub fn upgrade_records(&self) -> Vec<PackageUpgradeRecord> {
        self.upgrades.iter().map(|r| r.to_record()).collect()
    }

    /// Records of unchanged packages
    pub fn unchanged_records(&self) -> Vec<PackageUpgradeRecord> {
        self.unchanged.iter().map(|r| r.to_record()).collect()
    }
}
