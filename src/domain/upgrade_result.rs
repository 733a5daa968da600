//! Upgrade decision result types

use super::{PackageId, VersionSpecifier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version string reported when nothing is installed
pub const UNKNOWN_VERSION: &str = "unknown";

/// Why a dependency received its upgrade decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageVersionUpgradeType {
    /// Installed version already runs on Fusion
    NoUpgradeRequired,
    /// A compatible version satisfies the declared range
    UpgradeAvailable,
    /// A compatible version exists only outside the declared range
    PublicPackageFusionCompatibleVersionExceedsProjectConfig,
    /// Nothing says whether any version runs on Fusion
    PublicPackageMissingFusionEligibility,
    /// Every known version is incompatible
    PublicPackageNotCompatibleWithFusion,
    /// Private packages can only be judged by their own `require-dbt-version`
    PrivatePackageMissingRequireDbtVersion,
}

impl PackageVersionUpgradeType {
    /// Human-readable reason, used as the first log line of a result
    pub fn description(&self) -> &'static str {
        match self {
            PackageVersionUpgradeType::NoUpgradeRequired => {
                "Package is already compatible with Fusion"
            }
            PackageVersionUpgradeType::UpgradeAvailable => {
                "Package has Fusion-compatible version available"
            }
            PackageVersionUpgradeType::PublicPackageFusionCompatibleVersionExceedsProjectConfig => {
                "Public package has a Fusion-compatible version outside the version range in the project config"
            }
            PackageVersionUpgradeType::PublicPackageMissingFusionEligibility => {
                "Public package has not defined fusion eligibility"
            }
            PackageVersionUpgradeType::PublicPackageNotCompatibleWithFusion => {
                "Public package is not compatible with fusion"
            }
            PackageVersionUpgradeType::PrivatePackageMissingRequireDbtVersion => {
                "Private package requires a compatible require-dbt-version (>=2.0.0, <3.0.0) to be available on fusion. https://docs.getdbt.com/reference/project-configs/require-dbt-version"
            }
        }
    }

    /// Returns true if the decision names a version to move to
    pub fn is_upgrade(&self) -> bool {
        matches!(
            self,
            PackageVersionUpgradeType::UpgradeAvailable
                | PackageVersionUpgradeType::PublicPackageFusionCompatibleVersionExceedsProjectConfig
        )
    }

    /// Returns true if applying the decision changes the declared range
    pub fn requires_force(&self) -> bool {
        matches!(
            self,
            PackageVersionUpgradeType::PublicPackageFusionCompatibleVersionExceedsProjectConfig
        )
    }
}

impl fmt::Display for PackageVersionUpgradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// The decision for one declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageVersionUpgradeResult {
    /// Declared package identity
    pub id: PackageId,
    /// False for local, git and tarball packages
    pub public_package: bool,
    /// Installed version, or `unknown`
    pub previous_version: String,
    /// Highest candidate version, for upgrade decisions
    pub compatible_version: Option<VersionSpecifier>,
    /// Set once the upgrade has been applied
    pub upgraded_version: Option<VersionSpecifier>,
    /// Decision reason
    pub version_reason: PackageVersionUpgradeType,
    /// Extra log lines explaining the decision
    pub notes: Vec<String>,
    /// New identity if the package moved on the hub
    pub redirect: Option<PackageId>,
    /// Newest published version, if known
    pub latest_version: Option<VersionSpecifier>,
}

impl PackageVersionUpgradeResult {
    /// Creates a result with no candidate version
    pub fn new(
        id: PackageId,
        public_package: bool,
        previous_version: impl Into<String>,
        version_reason: PackageVersionUpgradeType,
    ) -> Self {
        Self {
            id,
            public_package,
            previous_version: previous_version.into(),
            compatible_version: None,
            upgraded_version: None,
            version_reason,
            notes: Vec::new(),
            redirect: None,
            latest_version: None,
        }
    }

    /// Sets the candidate version (builder pattern)
    pub fn with_compatible_version(mut self, version: VersionSpecifier) -> Self {
        self.compatible_version = Some(version);
        self
    }

    /// Records the package's new identity (builder pattern)
    pub fn with_redirect(mut self, redirect: PackageId) -> Self {
        self.redirect = Some(redirect);
        self
    }

    /// Records the newest published version (builder pattern)
    pub fn with_latest_version(mut self, version: Option<VersionSpecifier>) -> Self {
        self.latest_version = version;
        self
    }

    /// Adds an explanatory log line (builder pattern)
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Records that the candidate version was adopted
    ///
    /// Does nothing for decisions without a candidate.
    pub fn mark_upgraded(&mut self) {
        if self.version_reason.is_upgrade() {
            self.upgraded_version = self.compatible_version.clone();
        }
    }

    /// Returns true if the candidate version has been adopted
    pub fn is_upgraded(&self) -> bool {
        self.upgraded_version.is_some()
    }

    /// The version the manifest should declare after this run
    pub fn package_final_version(&self) -> String {
        match &self.upgraded_version {
            Some(v) if self.version_reason.is_upgrade() => v.to_version_string(),
            _ => self.previous_version.clone(),
        }
    }

    /// Reason description followed by any notes
    pub fn package_upgrade_logs(&self) -> Vec<String> {
        std::iter::once(self.version_reason.description().to_string())
            .chain(self.notes.iter().cloned())
            .collect()
    }

    /// Serializable summary for reporting
    pub fn to_record(&self) -> PackageUpgradeRecord {
        PackageUpgradeRecord {
            id: self.id.to_string(),
            version: self.package_final_version(),
            log: self.package_upgrade_logs(),
        }
    }
}

impl fmt::Display for PackageVersionUpgradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.upgraded_version, &self.compatible_version) {
            (Some(new), _) => write!(f, "{}: {} → {}", self.id, self.previous_version, new),
            (None, Some(candidate)) => write!(
                f,
                "{}: {} (compatible: {})",
                self.id, self.previous_version, candidate
            ),
            (None, None) => write!(f, "{}: {}", self.id, self.previous_version),
        }
    }
}

/// One line of the machine-readable report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageUpgradeRecord {
    /// Package identity
    pub id: String,
    /// Final resolved version
    pub version: String,
    /// Reason strings
    pub log: Vec<String>,
}
