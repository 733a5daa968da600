//! Core domain models for fusionup
//!
//! This module contains the fundamental types used throughout the application:
//! - Version specifiers and ranges
//! - Package identities and manifest formats
//! - Declared dependencies and installed package facts
//! - Fusion compatibility states
//! - Upgrade decisions and the per-run summary

mod compatibility;
mod dependency;
mod manifest_kind;
mod package_id;
mod summary;
mod upgrade_result;
mod version_range;
mod version_spec;

pub use compatibility::FusionCompatibilityState;
pub use dependency::{DeclaredDependency, InstalledFact, PackageSource};
pub use manifest_kind::ManifestKind;
pub use package_id::PackageId;
pub use summary::PackageUpgradeResult;
pub use upgrade_result::{
    PackageUpgradeRecord, PackageVersionUpgradeResult, PackageVersionUpgradeType, UNKNOWN_VERSION,
};
pub use version_range::{VersionRange, FUSION_VERSION};
pub use version_spec::{Matcher, VersionSpecifier};
