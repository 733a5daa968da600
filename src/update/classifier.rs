//! Per-package Fusion compatibility classification
//!
//! Every function here is a pure function of one declared dependency and the
//! knowledge base. Evidence is consulted in a fixed precedence, first match
//! wins:
//!
//! 1. manual overrides (disallow before allow)
//! 2. private packages are `UNKNOWN`
//! 3. the installed version's own `require-dbt-version`
//! 4. compatible versions in the knowledge base
//! 5. exhaustively incompatible versions in the knowledge base
//! 6. otherwise no eligibility data

use crate::domain::{DeclaredDependency, FusionCompatibilityState, VersionSpecifier};
use crate::knowledge_base::KnowledgeBase;

/// Classifies the package as a whole
pub fn classify(dependency: &DeclaredDependency, knowledge_base: &KnowledgeBase) -> FusionCompatibilityState {
    if let Some(state) = knowledge_base.overrides().state_for(&dependency.id) {
        return state;
    }
    if !dependency.is_public_package() {
        return FusionCompatibilityState::Unknown;
    }
    if dependency
        .installed
        .as_ref()
        .is_some_and(|fact| fact.declares_fusion_support())
    {
        return FusionCompatibilityState::DbtVersionRangeIncludes2_0;
    }

    let Some(entry) = knowledge_base.entry(&dependency.id) else {
        return FusionCompatibilityState::NoDbtVersionRange;
    };
    if !entry.fusion_compatible_versions.is_empty() {
        FusionCompatibilityState::DbtVersionRangeIncludes2_0
    } else if !entry.fusion_incompatible_versions.is_empty()
        && entry.unknown_compatibility_versions.is_empty()
    {
        FusionCompatibilityState::DbtVersionRangeExcludes2_0
    } else {
        FusionCompatibilityState::NoDbtVersionRange
    }
}

/// Classifies the installed version only
///
/// `UNKNOWN` when nothing is installed. Otherwise the installed package's own
/// `require-dbt-version` decides, then whether the knowledge base lists the
/// installed version as compatible or incompatible.
pub fn installed_version_state(
    dependency: &DeclaredDependency,
    knowledge_base: &KnowledgeBase,
) -> FusionCompatibilityState {
    if let Some(state) = knowledge_base.overrides().state_for(&dependency.id) {
        return state;
    }
    let Some(fact) = &dependency.installed else {
        return FusionCompatibilityState::Unknown;
    };
    if fact.declares_fusion_support() {
        return FusionCompatibilityState::DbtVersionRangeIncludes2_0;
    }
    if fact.declares_fusion_exclusion() {
        return FusionCompatibilityState::DbtVersionRangeExcludes2_0;
    }

    match (&fact.version, knowledge_base.entry(&dependency.id)) {
        (Some(version), Some(entry)) if entry.is_compatible_version(version) => {
            FusionCompatibilityState::DbtVersionRangeIncludes2_0
        }
        (Some(version), Some(entry)) if entry.is_incompatible_version(version) => {
            FusionCompatibilityState::DbtVersionRangeExcludes2_0
        }
        _ => FusionCompatibilityState::NoDbtVersionRange,
    }
}

/// Compatible versions satisfying the declared range, highest first
pub fn find_fusion_compatible_versions_in_requested_range(
    dependency: &DeclaredDependency,
    knowledge_base: &KnowledgeBase,
) -> Vec<VersionSpecifier> {
    knowledge_base
        .entry(&dependency.id)
        .map(|entry| entry.compatible_in_range(&dependency.project_config_version_range))
        .unwrap_or_default()
}

/// Compatible versions that would need a manifest edit to adopt, highest first
pub fn find_fusion_compatible_versions_outside_requested_range(
    dependency: &DeclaredDependency,
    knowledge_base: &KnowledgeBase,
) -> Vec<VersionSpecifier> {
    knowledge_base
        .entry(&dependency.id)
        .map(|entry| entry.compatible_outside_range(&dependency.project_config_version_range))
        .unwrap_or_default()
}

/// Incompatible versions satisfying the declared range, highest first
pub fn find_fusion_incompatible_versions_in_requested_range(
    dependency: &DeclaredDependency,
    knowledge_base: &KnowledgeBase,
) -> Vec<VersionSpecifier> {
    knowledge_base
        .entry(&dependency.id)
        .map(|entry| entry.incompatible_in_range(&dependency.project_config_version_range))
        .unwrap_or_default()
}

/// Unverified versions satisfying the declared range, highest first
pub fn find_unknown_versions_in_requested_range(
    dependency: &DeclaredDependency,
    knowledge_base: &KnowledgeBase,
) -> Vec<VersionSpecifier> {
    knowledge_base
        .entry(&dependency.id)
        .map(|entry| entry.unknown_in_range(&dependency.project_config_version_range))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstalledFact, PackageSource};
    use crate::knowledge_base::{KnowledgeBaseEntry, Overrides};

    fn v(s: &str) -> VersionSpecifier {
        VersionSpecifier::parse(s).unwrap()
    }

    fn vs(items: &[&str]) -> Vec<VersionSpecifier> {
        items.iter().map(|s| v(s)).collect()
    }

    fn kb(compatible: &[&str], incompatible: &[&str], unknown: &[&str]) -> KnowledgeBase {
        KnowledgeBase::empty().with_entry(
            "org/pkg",
            KnowledgeBaseEntry {
                fusion_compatible_versions: vs(compatible),
                fusion_incompatible_versions: vs(incompatible),
                unknown_compatibility_versions: vs(unknown),
                ..Default::default()
            },
        )
    }

    fn dep(range: &[&str]) -> DeclaredDependency {
        DeclaredDependency::hub("org/pkg", range.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_disallow_beats_allow_and_evidence() {
        let kb = kb(&["1.2.0"], &[], &[]).with_overrides(Overrides::new(["org/pkg"], ["org/pkg"]));
        assert_eq!(classify(&dep(&[]), &kb), FusionCompatibilityState::ExplicitDisallow);
        assert_eq!(
            installed_version_state(&dep(&[]), &kb),
            FusionCompatibilityState::ExplicitDisallow
        );
    }

    #[test]
    fn test_allow_override_beats_incompatible_evidence() {
        let kb = kb(&[], &["1.0.0"], &[]).with_overrides(Overrides::new(["org/pkg"], Vec::<String>::new()));
        assert_eq!(classify(&dep(&[]), &kb), FusionCompatibilityState::ExplicitAllow);
    }

    #[test]
    fn test_private_package_is_unknown() {
        let private = DeclaredDependency::private(PackageSource::Local, "org/pkg");
        assert_eq!(
            classify(&private, &kb(&["1.2.0"], &[], &[])),
            FusionCompatibilityState::Unknown
        );
    }

    #[test]
    fn test_installed_requirement_includes_fusion() {
        let dep = dep(&[]).with_installed(InstalledFact::new(
            "pkg",
            Some(v("1.0.0")),
            vec![">=1.0.0".into()],
        ));
        assert_eq!(
            classify(&dep, &KnowledgeBase::empty()),
            FusionCompatibilityState::DbtVersionRangeIncludes2_0
        );
    }

    #[test]
    fn test_knowledge_base_evidence() {
        assert_eq!(
            classify(&dep(&[]), &kb(&["1.6.0"], &["1.0.0"], &[])),
            FusionCompatibilityState::DbtVersionRangeIncludes2_0
        );
        assert_eq!(
            classify(&dep(&[]), &kb(&[], &["1.0.0"], &[])),
            FusionCompatibilityState::DbtVersionRangeExcludes2_0
        );
        assert_eq!(
            classify(&dep(&[]), &kb(&[], &["1.0.0"], &["1.1.0"])),
            FusionCompatibilityState::NoDbtVersionRange
        );
        assert_eq!(
            classify(&dep(&[]), &kb(&[], &[], &[])),
            FusionCompatibilityState::NoDbtVersionRange
        );
        assert_eq!(
            classify(&dep(&[]), &KnowledgeBase::empty()),
            FusionCompatibilityState::NoDbtVersionRange
        );
    }

    #[test]
    fn test_installed_version_state() {
        let kb = kb(&["1.2.0"], &["1.0.0"], &[]);
        let installed = |version: &str, reqs: &[&str]| {
            dep(&[]).with_installed(InstalledFact::new(
                "pkg",
                Some(v(version)),
                reqs.iter().map(|s| s.to_string()).collect(),
            ))
        };

        assert_eq!(installed_version_state(&dep(&[]), &kb), FusionCompatibilityState::Unknown);
        assert_eq!(
            installed_version_state(&installed("1.0.0", &[">=1.0.0, <3.0.0"]), &kb),
            FusionCompatibilityState::DbtVersionRangeIncludes2_0
        );
        assert_eq!(
            installed_version_state(&installed("1.2.0", &[">=1.0.0", "<2.0.0"]), &kb),
            FusionCompatibilityState::DbtVersionRangeExcludes2_0
        );
        assert_eq!(
            installed_version_state(&installed("1.2.0", &[]), &kb),
            FusionCompatibilityState::DbtVersionRangeIncludes2_0
        );
        assert_eq!(
            installed_version_state(&installed("1.0.0", &[]), &kb),
            FusionCompatibilityState::DbtVersionRangeExcludes2_0
        );
        assert_eq!(
            installed_version_state(&installed("1.1.0", &[]), &kb),
            FusionCompatibilityState::NoDbtVersionRange
        );
    }

    #[test]
    fn test_range_queries_sorted_descending() {
        let kb = kb(&["1.2.0", "1.4.1", "1.0.0", "1.6.0"], &["0.9.0", "1.1.0"], &["1.3.0"]);
        let dep = dep(&[">=1.0.0", "<1.5.0"]);

        let in_range = find_fusion_compatible_versions_in_requested_range(&dep, &kb);
        assert_eq!(in_range, vs(&["1.4.1", "1.2.0", "1.0.0"]));
        assert!(in_range.windows(2).all(|w| w[0] > w[1]));

        assert_eq!(
            find_fusion_compatible_versions_outside_requested_range(&dep, &kb),
            vs(&["1.6.0"])
        );
        assert_eq!(
            find_fusion_incompatible_versions_in_requested_range(&dep, &kb),
            vs(&["1.1.0"])
        );
        assert_eq!(find_unknown_versions_in_requested_range(&dep, &kb), vs(&["1.3.0"]));
    }

    #[test]
    fn test_range_queries_without_entry_are_empty() {
        let dep = DeclaredDependency::hub("org/other", vec![]);
        assert!(find_fusion_compatible_versions_in_requested_range(&dep, &kb(&["1.0.0"], &[], &[])).is_empty());
    }
}
