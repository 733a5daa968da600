//! Applying upgrade decisions
//!
//! In-range upgrades keep the project's declared range satisfied and are
//! always applied. Out-of-range upgrades change the declared range and are
//! applied only when forced.

use crate::domain::{
    PackageId, PackageUpgradeResult, PackageVersionUpgradeResult, PackageVersionUpgradeType,
};
use crate::manifest::DbtPackageFile;
use std::collections::HashSet;
use tracing::info;

/// Decisions split by how they may be applied
#[derive(Debug, Default)]
pub struct UpgradePlan<'a> {
    /// Upgrades within the declared range
    pub in_range: Vec<&'a PackageVersionUpgradeResult>,
    /// Upgrades that need `--force-upgrade`
    pub forced: Vec<&'a PackageVersionUpgradeResult>,
    /// Everything else
    pub no_change: Vec<&'a PackageVersionUpgradeResult>,
}

/// Splits decisions into in-range, forced and no-change buckets
pub fn partition_upgrades(results: &[PackageVersionUpgradeResult]) -> UpgradePlan<'_> {
    let mut plan = UpgradePlan::default();
    for result in results {
        match (result.version_reason, &result.compatible_version) {
            (PackageVersionUpgradeType::UpgradeAvailable, Some(_)) => plan.in_range.push(result),
            (reason, Some(_)) if reason.requires_force() => plan.forced.push(result),
            _ => plan.no_change.push(result),
        }
    }
    plan
}

/// Adopts the candidate version of every applicable decision
///
/// In-range upgrades are always adopted, forced upgrades only with
/// `force_upgrade`. The returned summary keeps declaration order within each
/// bucket.
pub fn upgrade_package_versions(
    package_file: &DbtPackageFile,
    results: Vec<PackageVersionUpgradeResult>,
    force_upgrade: bool,
    dry_run: bool,
) -> PackageUpgradeResult {
    let adopted: HashSet<PackageId> = {
        let plan = partition_upgrades(&results);
        if !force_upgrade {
            for result in &plan.forced {
                info!(package = %result.id, "upgrade is outside the declared range, use --force-upgrade to apply it");
            }
        }
        let forced = if force_upgrade { plan.forced } else { Vec::new() };
        plan.in_range
            .into_iter()
            .chain(forced)
            .map(|result| result.id.clone())
            .collect()
    };

    let mut summary = PackageUpgradeResult::new(package_file.path(), package_file.kind(), dry_run);
    for mut result in results {
        if adopted.contains(&result.id) {
            result.mark_upgraded();
        }
        summary.add_result(result);
    }
    summary
}
