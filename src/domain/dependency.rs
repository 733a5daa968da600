//! Declared dependency and installed package structures

use super::{FusionCompatibilityState, PackageId, VersionRange, VersionSpecifier, UNKNOWN_VERSION};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Where a declared package comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageSource {
    /// `package: namespace/name` from the package hub
    Hub,
    /// `local: path`
    Local,
    /// `git: url`
    Git,
    /// `tarball: url`
    Tarball,
}

impl PackageSource {
    /// Manifest key that introduces an entry of this source
    pub fn manifest_key(&self) -> &'static str {
        match self {
            PackageSource::Hub => "package",
            PackageSource::Local => "local",
            PackageSource::Git => "git",
            PackageSource::Tarball => "tarball",
        }
    }

    /// Returns true for hub packages
    pub fn is_public(&self) -> bool {
        matches!(self, PackageSource::Hub)
    }
}

/// Metadata of a package materialised in the project's install directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledFact {
    /// `name` from the package's own dbt_project.yml
    pub name: String,
    /// Parsed `version`, if present and valid
    pub version: Option<VersionSpecifier>,
    /// Raw `require-dbt-version` entries
    pub require_dbt_version: Vec<String>,
    /// Parsed `require-dbt-version`; `None` if undeclared or unparseable
    pub require_dbt_version_range: Option<VersionRange>,
}

impl InstalledFact {
    /// Creates a fact, parsing `require-dbt-version` leniently
    pub fn new(
        name: impl Into<String>,
        version: Option<VersionSpecifier>,
        require_dbt_version: Vec<String>,
    ) -> Self {
        let name = name.into();
        let require_dbt_version_range = if require_dbt_version.is_empty() {
            None
        } else {
            match VersionRange::parse(&require_dbt_version) {
                Ok(range) => Some(range),
                Err(e) => {
                    warn!(package = %name, error = %e, "ignoring unparseable require-dbt-version");
                    None
                }
            }
        };
        Self {
            name,
            version,
            require_dbt_version,
            require_dbt_version_range,
        }
    }

    /// Returns true if the package's own `require-dbt-version` accepts Fusion
    pub fn declares_fusion_support(&self) -> bool {
        self.require_dbt_version_range
            .as_ref()
            .is_some_and(VersionRange::includes_fusion)
    }

    /// Returns true if the package declares a `require-dbt-version` that
    /// rejects Fusion
    pub fn declares_fusion_exclusion(&self) -> bool {
        self.require_dbt_version_range
            .as_ref()
            .is_some_and(|range| !range.includes_fusion())
    }
}

/// One entry of the manifest's `packages:` list, enriched with what is
/// installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredDependency {
    /// Unique key within the manifest
    pub id: PackageId,
    /// Local project name, used to match installed packages
    pub name: String,
    /// Where the package comes from
    pub source: PackageSource,
    /// Raw `version:` constraints as written
    pub raw_version: Vec<String>,
    /// Declared constraints collapsed into one range
    pub project_config_version_range: VersionRange,
    /// Why the declared constraints were ignored, if they were
    pub version_range_error: Option<String>,
    /// `install-prerelease: true`
    pub opt_in_prerelease: bool,
    /// Installed metadata, once merged
    pub installed: Option<InstalledFact>,
    /// State of the installed version, once merged
    pub installed_version_state: FusionCompatibilityState,
}

impl DeclaredDependency {
    /// Creates a dependency, collapsing its declared constraints
    ///
    /// Constraints that fail to parse leave the range unconstrained; the
    /// failure is kept in `version_range_error` so reports can flag it.
    pub fn new(
        id: PackageId,
        name: impl Into<String>,
        source: PackageSource,
        raw_version: Vec<String>,
    ) -> Self {
        let (range, error) = match VersionRange::parse(&raw_version) {
            Ok(range) => (range, None),
            Err(e) => {
                warn!(package = %id, error = %e, "declared version constraint ignored, treating as unconstrained");
                (VersionRange::unbounded(), Some(e.to_string()))
            }
        };
        Self {
            id,
            name: name.into(),
            source,
            raw_version,
            project_config_version_range: range,
            version_range_error: error,
            opt_in_prerelease: false,
            installed: None,
            installed_version_state: FusionCompatibilityState::Unknown,
        }
    }

    /// Creates a hub dependency named after the last part of its identity
    pub fn hub(id: impl Into<PackageId>, raw_version: Vec<String>) -> Self {
        let id = id.into();
        let name = id.name().to_string();
        Self::new(id, name, PackageSource::Hub, raw_version)
    }

    /// Creates a private dependency keyed by its source reference
    pub fn private(source: PackageSource, reference: impl Into<String>) -> Self {
        let id = PackageId::new(reference);
        let name = id.name().to_string();
        Self::new(id, name, source, Vec::new())
    }

    /// Overrides the local project name (builder pattern)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Opts in to pre-release candidates (builder pattern)
    pub fn with_prerelease(mut self, opt_in: bool) -> Self {
        self.opt_in_prerelease = opt_in;
        self
    }

    /// Attaches installed metadata (builder pattern)
    pub fn with_installed(mut self, fact: InstalledFact) -> Self {
        self.installed = Some(fact);
        self
    }

    /// Returns true for hub packages
    pub fn is_public_package(&self) -> bool {
        self.source.is_public()
    }

    /// The installed version, if known
    pub fn installed_version(&self) -> Option<&VersionSpecifier> {
        self.installed.as_ref().and_then(|fact| fact.version.as_ref())
    }

    /// The installed version as a string, or `unknown`
    pub fn installed_version_string(&self) -> String {
        self.installed_version()
            .map(VersionSpecifier::to_version_string)
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }

    /// Returns true if the declared constraints could not be parsed
    pub fn has_unparseable_range(&self) -> bool {
        self.version_range_error.is_some()
    }
}

impl fmt::Display for DeclaredDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ({})",
            self.id,
            self.project_config_version_range,
            self.source.manifest_key()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionSpecifier {
        VersionSpecifier::parse(s).unwrap()
    }

    #[test]
    fn test_hub_dependency() {
        let dep = DeclaredDependency::hub("dbt-labs/dbt_utils", vec![">=1.0.0".into(), "<2.0.0".into()]);
        assert_eq!(dep.name, "dbt_utils");
        assert!(dep.is_public_package());
        assert!(dep.project_config_version_range.contains(&v("1.3.0")));
        assert!(!dep.has_unparseable_range());
        assert_eq!(dep.installed_version_string(), "unknown");
    }

    #[test]
    fn test_private_dependency() {
        let dep = DeclaredDependency::private(
            PackageSource::Git,
            "https://github.com/org/internal-macros.git",
        );
        assert!(!dep.is_public_package());
        assert_eq!(dep.name, "internal-macros");
        assert!(dep.project_config_version_range.is_unbounded());

        let named = DeclaredDependency::private(PackageSource::Tarball, "https://x.io/a.tgz")
            .with_name("pkg_a");
        assert_eq!(named.name, "pkg_a");
    }

    #[test]
    fn test_unparseable_range_is_unconstrained_and_flagged() {
        let dep = DeclaredDependency::hub("org/pkg", vec!["1.0".into()]);
        assert!(dep.project_config_version_range.is_unbounded());
        assert!(dep.has_unparseable_range());
        assert!(dep
            .version_range_error
            .as_deref()
            .unwrap()
            .contains("malformed version"));
    }

    #[test]
    fn test_conflicting_range_is_unconstrained_and_flagged() {
        let dep = DeclaredDependency::hub("org/pkg", vec![">=2.0.0".into(), "<1.0.0".into()]);
        assert!(dep.project_config_version_range.is_unbounded());
        assert!(dep.has_unparseable_range());
    }

    #[test]
    fn test_installed_fact_fusion_declaration() {
        let includes = InstalledFact::new("pkg", Some(v("1.0.0")), vec![">=1.3.0".into(), "<3.0.0".into()]);
        assert!(includes.declares_fusion_support());
        assert!(!includes.declares_fusion_exclusion());

        let excludes = InstalledFact::new("pkg", Some(v("1.0.0")), vec![">=1.3.0,<2.0.0".into()]);
        assert!(!excludes.declares_fusion_support());
        assert!(excludes.declares_fusion_exclusion());

        let undeclared = InstalledFact::new("pkg", Some(v("1.0.0")), Vec::new());
        assert!(!undeclared.declares_fusion_support());
        assert!(!undeclared.declares_fusion_exclusion());
    }

    #[test]
    fn test_installed_fact_bad_require_dbt_version() {
        let fact = InstalledFact::new("pkg", None, vec![">=1.x".into()]);
        assert!(fact.require_dbt_version_range.is_none());
        assert!(!fact.declares_fusion_support());
    }

    #[test]
    fn test_installed_version_string() {
        let dep = DeclaredDependency::hub("org/pkg", Vec::new())
            .with_installed(InstalledFact::new("pkg", Some(v("0.9.0")), Vec::new()));
        assert_eq!(dep.installed_version_string(), "0.9.0");
    }

    #[test]
    fn test_display() {
        let dep = DeclaredDependency::hub("org/pkg", vec![">=1.0.0".into()]);
        assert_eq!(dep.to_string(), "org/pkg [>=1.0.0] (package)");
    }
}
