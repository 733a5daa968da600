//! Fusion compatibility knowledge base
//!
//! This module provides:
//! - The snapshot JSON shape published for hub packages
//! - `KnowledgeBase`, an immutable per-run lookup by package identity
//! - Manual allow/disallow overrides
//! - Sources (local file, HTTP URL, none) behind one async trait

mod client;
mod source;

pub use client::{HttpClient, DEFAULT_TIMEOUT};
pub use source::{
    load_knowledge_base, EmptySource, FileSource, KnowledgeBaseSource, SourceSpec, UrlSource,
};

use crate::domain::{FusionCompatibilityState, PackageId, VersionRange, VersionSpecifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Knowledge base snapshot as published
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseSnapshot {
    /// When the snapshot was generated
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    /// Packages verified compatible, every version
    #[serde(default)]
    pub explicit_allow: Vec<String>,
    /// Packages verified incompatible, every version
    #[serde(default)]
    pub explicit_disallow: Vec<String>,
    /// Per-package version partitions
    #[serde(default)]
    pub packages: HashMap<String, SnapshotEntry>,
}

/// One package in a published snapshot; versions are raw strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub redirect_namespace: Option<String>,
    #[serde(default)]
    pub redirect_name: Option<String>,
    #[serde(default)]
    pub fusion_compatible_versions: Vec<String>,
    #[serde(default)]
    pub fusion_incompatible_versions: Vec<String>,
    #[serde(default)]
    pub unknown_compatibility_versions: Vec<String>,
}

/// Known version partitions for one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBaseEntry {
    /// Newest published version
    pub latest_version: Option<VersionSpecifier>,
    /// New identity if the package moved on the hub
    pub redirect: Option<PackageId>,
    /// Versions whose `require-dbt-version` accepts 2.0.0
    pub fusion_compatible_versions: Vec<VersionSpecifier>,
    /// Versions whose `require-dbt-version` rejects 2.0.0
    pub fusion_incompatible_versions: Vec<VersionSpecifier>,
    /// Versions without a `require-dbt-version`
    pub unknown_compatibility_versions: Vec<VersionSpecifier>,
}

impl KnowledgeBaseEntry {
    /// Builds an entry from a snapshot, skipping malformed versions
    fn from_snapshot(id: &str, raw: SnapshotEntry) -> Self {
        let redirect = match (raw.redirect_namespace, raw.redirect_name) {
            (Some(ns), Some(name)) => Some(PackageId::from_parts(&ns, &name)),
            (Some(ns), None) => Some(PackageId::from_parts(&ns, PackageId::from(id).name())),
            (None, Some(name)) => Some(match PackageId::from(id).namespace() {
                Some(ns) => PackageId::from_parts(ns, &name),
                None => PackageId::new(name),
            }),
            (None, None) => None,
        };

        Self {
            latest_version: raw
                .latest_version
                .as_deref()
                .and_then(|v| parse_snapshot_version(id, v)),
            redirect: redirect.filter(|target| target.as_str() != id),
            fusion_compatible_versions: parse_snapshot_versions(id, &raw.fusion_compatible_versions),
            fusion_incompatible_versions: parse_snapshot_versions(
                id,
                &raw.fusion_incompatible_versions,
            ),
            unknown_compatibility_versions: parse_snapshot_versions(
                id,
                &raw.unknown_compatibility_versions,
            ),
        }
    }

    /// Compatible versions that satisfy `range`, highest first
    pub fn compatible_in_range(&self, range: &VersionRange) -> Vec<VersionSpecifier> {
        filter_sorted(&self.fusion_compatible_versions, |v| range.contains(v))
    }

    /// Compatible versions that fall outside `range`, highest first
    pub fn compatible_outside_range(&self, range: &VersionRange) -> Vec<VersionSpecifier> {
        filter_sorted(&self.fusion_compatible_versions, |v| !range.contains(v))
    }

    /// Incompatible versions that satisfy `range`, highest first
    pub fn incompatible_in_range(&self, range: &VersionRange) -> Vec<VersionSpecifier> {
        filter_sorted(&self.fusion_incompatible_versions, |v| range.contains(v))
    }

    /// Unverified versions that satisfy `range`, highest first
    pub fn unknown_in_range(&self, range: &VersionRange) -> Vec<VersionSpecifier> {
        filter_sorted(&self.unknown_compatibility_versions, |v| range.contains(v))
    }

    /// Returns true if `version` is listed as compatible
    pub fn is_compatible_version(&self, version: &VersionSpecifier) -> bool {
        contains_version(&self.fusion_compatible_versions, version)
    }

    /// Returns true if `version` is listed as incompatible
    pub fn is_incompatible_version(&self, version: &VersionSpecifier) -> bool {
        contains_version(&self.fusion_incompatible_versions, version)
    }
}

fn contains_version(versions: &[VersionSpecifier], version: &VersionSpecifier) -> bool {
    versions
        .iter()
        .any(|v| v.cmp_version(version) == std::cmp::Ordering::Equal)
}

fn filter_sorted(
    versions: &[VersionSpecifier],
    keep: impl Fn(&VersionSpecifier) -> bool,
) -> Vec<VersionSpecifier> {
    let mut matched: Vec<VersionSpecifier> = versions.iter().filter(|v| keep(v)).cloned().collect();
    matched.sort_by(|a, b| b.cmp(a));
    matched.dedup_by(|a, b| a.cmp_version(b) == std::cmp::Ordering::Equal);
    matched
}

fn parse_snapshot_version(id: &str, raw: &str) -> Option<VersionSpecifier> {
    let cleaned = raw.trim().trim_start_matches(['v', 'V']);
    match VersionSpecifier::parse(cleaned) {
        Ok(version) => Some(version),
        Err(e) => {
            warn!(package = id, version = raw, error = %e, "skipping malformed knowledge base version");
            None
        }
    }
}

fn parse_snapshot_versions(id: &str, raw: &[String]) -> Vec<VersionSpecifier> {
    raw.iter()
        .filter_map(|v| parse_snapshot_version(id, v))
        .collect()
}

/// Manual compatibility overrides by package identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    allow: BTreeSet<PackageId>,
    disallow: BTreeSet<PackageId>,
}

impl Overrides {
    /// Creates override sets from identity strings
    pub fn new<A, D>(allow: A, disallow: D) -> Self
    where
        A: IntoIterator,
        A::Item: Into<PackageId>,
        D: IntoIterator,
        D::Item: Into<PackageId>,
    {
        Self {
            allow: allow.into_iter().map(Into::into).collect(),
            disallow: disallow.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds every identity of `other` to this set
    pub fn extend(&mut self, other: Overrides) {
        self.allow.extend(other.allow);
        self.disallow.extend(other.disallow);
    }

    /// Returns true if the identity is explicitly allowed
    pub fn is_allowed(&self, id: &PackageId) -> bool {
        self.allow.contains(id)
    }

    /// Returns true if the identity is explicitly disallowed
    pub fn is_disallowed(&self, id: &PackageId) -> bool {
        self.disallow.contains(id)
    }

    /// The override state for an identity; disallow wins over allow
    pub fn state_for(&self, id: &PackageId) -> Option<FusionCompatibilityState> {
        if self.is_disallowed(id) {
            Some(FusionCompatibilityState::ExplicitDisallow)
        } else if self.is_allowed(id) {
            Some(FusionCompatibilityState::ExplicitAllow)
        } else {
            None
        }
    }

    /// Returns true if no override is set
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.disallow.is_empty()
    }
}

/// Read-only compatibility data for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    generated_at: Option<DateTime<Utc>>,
    entries: HashMap<PackageId, KnowledgeBaseEntry>,
    overrides: Overrides,
}

impl KnowledgeBase {
    /// A knowledge base with no entries and no overrides
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a knowledge base from a published snapshot
    pub fn from_snapshot(snapshot: KnowledgeBaseSnapshot) -> Self {
        let entries = snapshot
            .packages
            .into_iter()
            .map(|(id, raw)| {
                let entry = KnowledgeBaseEntry::from_snapshot(&id, raw);
                (PackageId::new(id), entry)
            })
            .collect();

        Self {
            generated_at: snapshot.generated_at,
            entries,
            overrides: Overrides::new(snapshot.explicit_allow, snapshot.explicit_disallow),
        }
    }

    /// Adds an entry (builder pattern)
    pub fn with_entry(mut self, id: impl Into<PackageId>, entry: KnowledgeBaseEntry) -> Self {
        self.entries.insert(id.into(), entry);
        self
    }

    /// Unions extra overrides into the snapshot's own (builder pattern)
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Entry for a package, if the knowledge base knows it
    pub fn entry(&self, id: &PackageId) -> Option<&KnowledgeBaseEntry> {
        self.entries.get(id)
    }

    /// Manual overrides
    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// When the snapshot was generated, if recorded
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }

    /// Number of packages with version data
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there is neither version data nor any override
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.overrides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionSpecifier {
        VersionSpecifier::parse(s).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_snapshot() -> KnowledgeBaseSnapshot {
        serde_json::from_str(
            r#"{
                "generated_at": "2025-06-01T00:00:00Z",
                "explicit_allow": ["dbt-labs/dbt_utils"],
                "explicit_disallow": ["dbt-labs/logging"],
                "packages": {
                    "org/pkg": {
                        "latest_version": "v1.6.0",
                        "fusion_compatible_versions": ["1.2.0", "1.6.0", "not-a-version", "1.4.0"],
                        "fusion_incompatible_versions": ["1.0.0"],
                        "unknown_compatibility_versions": []
                    },
                    "old-org/moved": {
                        "redirect_namespace": "new-org",
                        "redirect_name": "moved_pkg"
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_snapshot_skips_malformed_versions() {
        let kb = KnowledgeBase::from_snapshot(sample_snapshot());
        let entry = kb.entry(&PackageId::from("org/pkg")).unwrap();
        assert_eq!(entry.fusion_compatible_versions.len(), 3);
        assert_eq!(entry.latest_version, Some(v("1.6.0")));
        assert!(kb.generated_at().is_some());
        assert_eq!(kb.len(), 2);
    }

    #[test]
    fn test_missing_entry_is_none() {
        let kb = KnowledgeBase::from_snapshot(sample_snapshot());
        assert!(kb.entry(&PackageId::from("org/unknown")).is_none());
    }

    #[test]
    fn test_redirect() {
        let kb = KnowledgeBase::from_snapshot(sample_snapshot());
        let entry = kb.entry(&PackageId::from("old-org/moved")).unwrap();
        assert_eq!(entry.redirect, Some(PackageId::from("new-org/moved_pkg")));
        assert!(kb.entry(&PackageId::from("org/pkg")).unwrap().redirect.is_none());
    }

    #[test]
    fn test_redirect_namespace_only_keeps_name() {
        let entry = KnowledgeBaseEntry::from_snapshot(
            "fivetran/ad_reporting",
            SnapshotEntry {
                redirect_namespace: Some("fivetran-labs".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(
            entry.redirect,
            Some(PackageId::from("fivetran-labs/ad_reporting"))
        );
    }

    #[test]
    fn test_range_queries_sorted_descending() {
        let kb = KnowledgeBase::from_snapshot(sample_snapshot());
        let entry = kb.entry(&PackageId::from("org/pkg")).unwrap();
        let range = VersionRange::parse(&[">=1.0.0", "<1.5.0"]).unwrap();

        assert_eq!(entry.compatible_in_range(&range), vec![v("1.4.0"), v("1.2.0")]);
        assert_eq!(entry.compatible_outside_range(&range), vec![v("1.6.0")]);
        assert_eq!(entry.incompatible_in_range(&range), vec![v("1.0.0")]);
        assert!(entry.unknown_in_range(&range).is_empty());
    }

    #[test]
    fn test_range_query_dedups_equal_versions() {
        let entry = KnowledgeBaseEntry {
            fusion_compatible_versions: vec![v("1.2.0"), v("1.2.0"), v("1.1.0")],
            ..Default::default()
        };
        assert_eq!(
            entry.compatible_in_range(&VersionRange::unbounded()),
            vec![v("1.2.0"), v("1.1.0")]
        );
    }

    #[test]
    fn test_version_membership() {
        let kb = KnowledgeBase::from_snapshot(sample_snapshot());
        let entry = kb.entry(&PackageId::from("org/pkg")).unwrap();
        assert!(entry.is_compatible_version(&v("1.2.0")));
        assert!(entry.is_incompatible_version(&v("1.0.0")));
        assert!(!entry.is_compatible_version(&v("1.0.0")));
    }

    #[test]
    fn test_overrides_disallow_wins() {
        let overrides = Overrides::new(["org/both", "org/allowed"], ["org/both"]);
        assert_eq!(
            overrides.state_for(&PackageId::from("org/both")),
            Some(FusionCompatibilityState::ExplicitDisallow)
        );
        assert_eq!(
            overrides.state_for(&PackageId::from("org/allowed")),
            Some(FusionCompatibilityState::ExplicitAllow)
        );
        assert_eq!(overrides.state_for(&PackageId::from("org/none")), None);
    }

    #[test]
    fn test_with_overrides_unions() {
        let kb = KnowledgeBase::from_snapshot(sample_snapshot())
            .with_overrides(Overrides::new(strings(&["org/pkg"]), Vec::<String>::new()));
        assert!(kb.overrides().is_allowed(&PackageId::from("org/pkg")));
        assert!(kb.overrides().is_allowed(&PackageId::from("dbt-labs/dbt_utils")));
        assert!(kb.overrides().is_disallowed(&PackageId::from("dbt-labs/logging")));
    }

    #[test]
    fn test_empty() {
        let kb = KnowledgeBase::empty();
        assert!(kb.is_empty());
        assert_eq!(kb.len(), 0);
        assert!(!KnowledgeBase::empty()
            .with_overrides(Overrides::new(["a/b"], Vec::<String>::new()))
            .is_empty());
    }

    #[test]
    fn test_snapshot_defaults() {
        let snapshot: KnowledgeBaseSnapshot = serde_json::from_str("{}").unwrap();
        assert!(KnowledgeBase::from_snapshot(snapshot).is_empty());
    }
}
