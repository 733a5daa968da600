//! Upgrade judgment for declared dependencies
//!
//! This module provides:
//! - Per-package compatibility classification
//! - The upgrade judgment that turns a classification into a decision
//! - Application of decisions, with out-of-range upgrades behind a flag

mod apply;
mod classifier;

pub use apply::{partition_upgrades, upgrade_package_versions, UpgradePlan};
pub use classifier::{
    classify, find_fusion_compatible_versions_in_requested_range,
    find_fusion_compatible_versions_outside_requested_range,
    find_fusion_incompatible_versions_in_requested_range, find_unknown_versions_in_requested_range,
    installed_version_state,
};

use crate::domain::{
    DeclaredDependency, FusionCompatibilityState, PackageVersionUpgradeResult,
    PackageVersionUpgradeType, VersionSpecifier,
};
use crate::knowledge_base::KnowledgeBase;
use crate::manifest::DbtPackageFile;
use std::cmp::Ordering;
use tracing::debug;

/// Decides one outcome per declared dependency
pub struct UpgradeJudge<'a> {
    knowledge_base: &'a KnowledgeBase,
}

impl<'a> UpgradeJudge<'a> {
    /// Create a judge backed by a knowledge base
    pub fn new(knowledge_base: &'a KnowledgeBase) -> Self {
        Self { knowledge_base }
    }

    /// Judge one dependency
    ///
    /// Steps, first match wins: private package, installed version already
    /// compatible, exhaustively incompatible, no eligibility data, then the
    /// highest eligible candidate in range and out of range. A package left
    /// without a candidate falls back to missing eligibility.
    pub fn judge(&self, dependency: &DeclaredDependency) -> PackageVersionUpgradeResult {
        let result = self.decide(dependency);
        debug!(package = %dependency.id, reason = ?result.version_reason, "judged package");
        self.annotate(dependency, result)
    }

    fn decide(&self, dependency: &DeclaredDependency) -> PackageVersionUpgradeResult {
        let outcome = |reason| {
            PackageVersionUpgradeResult::new(
                dependency.id.clone(),
                dependency.is_public_package(),
                dependency.installed_version_string(),
                reason,
            )
        };

        if !dependency.is_public_package() {
            return outcome(PackageVersionUpgradeType::PrivatePackageMissingRequireDbtVersion);
        }

        let state = classify(dependency, self.knowledge_base);
        if installed_version_state(dependency, self.knowledge_base).is_compatible()
            || state == FusionCompatibilityState::ExplicitAllow
        {
            return outcome(PackageVersionUpgradeType::NoUpgradeRequired);
        }

        match state {
            s if s.is_incompatible() => {
                outcome(PackageVersionUpgradeType::PublicPackageNotCompatibleWithFusion)
            }
            FusionCompatibilityState::NoDbtVersionRange | FusionCompatibilityState::Unknown => {
                outcome(PackageVersionUpgradeType::PublicPackageMissingFusionEligibility)
            }
            _ => self.pick_candidate(dependency, outcome),
        }
    }

    fn pick_candidate(
        &self,
        dependency: &DeclaredDependency,
        outcome: impl Fn(PackageVersionUpgradeType) -> PackageVersionUpgradeResult,
    ) -> PackageVersionUpgradeResult {
        let installed = dependency.installed_version();
        let eligible = |v: &&VersionSpecifier| {
            (dependency.opt_in_prerelease || !v.is_prerelease())
                && installed.map_or(true, |i| v.cmp_version(i) != Ordering::Less)
        };

        let in_range = find_fusion_compatible_versions_in_requested_range(dependency, self.knowledge_base);
        if let Some(best) = in_range.iter().find(&eligible) {
            return outcome(PackageVersionUpgradeType::UpgradeAvailable)
                .with_compatible_version(best.clone());
        }

        let outside = find_fusion_compatible_versions_outside_requested_range(dependency, self.knowledge_base);
        if let Some(best) = outside.iter().find(&eligible) {
            return outcome(
                PackageVersionUpgradeType::PublicPackageFusionCompatibleVersionExceedsProjectConfig,
            )
            .with_compatible_version(best.clone());
        }

        let has_stable = in_range
            .iter()
            .chain(outside.iter())
            .any(|v| dependency.opt_in_prerelease || !v.is_prerelease());
        let note = match (installed, has_stable) {
            (Some(installed), true) => format!(
                "Only Fusion-compatible versions older than the installed version {} are known",
                installed
            ),
            (_, false) if !in_range.is_empty() || !outside.is_empty() => {
                "Only pre-release Fusion-compatible versions are known; set install-prerelease: true to consider them"
                    .to_string()
            }
            _ => "No Fusion-compatible version could be selected".to_string(),
        };
        outcome(PackageVersionUpgradeType::PublicPackageMissingFusionEligibility).with_note(note)
    }

    fn annotate(
        &self,
        dependency: &DeclaredDependency,
        mut result: PackageVersionUpgradeResult,
    ) -> PackageVersionUpgradeResult {
        if let Some(error) = &dependency.version_range_error {
            result = result.with_note(format!(
                "Declared version constraint was ignored because it could not be parsed: {}",
                error
            ));
        }
        if matches!(
            result.version_reason,
            PackageVersionUpgradeType::PublicPackageNotCompatibleWithFusion
                | PackageVersionUpgradeType::PublicPackageMissingFusionEligibility
        ) {
            if let Some(note) = self.range_diagnostics(dependency) {
                result = result.with_note(note);
            }
        }
        if let Some(entry) = self.knowledge_base.entry(&dependency.id) {
            if let Some(redirect) = &entry.redirect {
                result = result
                    .with_note(format!(
                        "Package has moved to {}, update the manifest to use the new name",
                        redirect
                    ))
                    .with_redirect(redirect.clone());
            }
            result = result.with_latest_version(entry.latest_version.clone());
        }
        result
    }

    /// Known incompatible and unverified versions within the declared range
    fn range_diagnostics(&self, dependency: &DeclaredDependency) -> Option<String> {
        let join = |versions: Vec<VersionSpecifier>| {
            versions
                .iter()
                .map(VersionSpecifier::to_version_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let incompatible =
            find_fusion_incompatible_versions_in_requested_range(dependency, self.knowledge_base);
        let unknown = find_unknown_versions_in_requested_range(dependency, self.knowledge_base);

        let parts: Vec<String> = [
            (incompatible, "incompatible with Fusion"),
            (unknown, "without a require-dbt-version"),
        ]
        .into_iter()
        .filter(|(versions, _)| !versions.is_empty())
        .map(|(versions, label)| format!("{} {}", join(versions), label))
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(format!("Versions in the declared range: {}", parts.join("; ")))
        }
    }
}

/// Judges every declared dependency, in declaration order
///
/// Returns exactly one result per dependency.
pub fn check_for_package_upgrades(
    package_file: &DbtPackageFile,
    knowledge_base: &KnowledgeBase,
) -> Vec<PackageVersionUpgradeResult> {
    let judge = UpgradeJudge::new(knowledge_base);
    package_file
        .dependencies()
        .iter()
        .map(|dependency| judge.judge(dependency))
        .collect()
}
