//! Version specifier types for dbt package versions
//!
//! Handles version strings as they appear in packages.yml, dependencies.yml,
//! `require-dbt-version` and the compatibility knowledge base:
//! - Exact: `1.2.3`, `=1.2.3`
//! - Comparison: `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3`
//! - Pre-release and build metadata: `1.0.0-rc.1`, `1.0.0rc1`, `1.0.0+build.5`

use crate::error::VersionError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SPECIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<matcher>>=|<=|>|<|=)?\s*(?P<major>0|[1-9]\d*)\.(?P<minor>0|[1-9]\d*)\.(?P<patch>0|[1-9]\d*)(?:-?(?P<pre>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+(?P<build>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .unwrap()
});

/// Comparison operator in front of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Matcher {
    /// `=1.2.3` or a bare `1.2.3`
    Exact,
    /// `>=1.2.3`
    GreaterOrEqual,
    /// `>1.2.3`
    Greater,
    /// `<=1.2.3`
    LessOrEqual,
    /// `<1.2.3`
    Less,
}

impl Matcher {
    fn from_prefix(prefix: Option<&str>) -> Self {
        match prefix {
            Some(">=") => Matcher::GreaterOrEqual,
            Some(">") => Matcher::Greater,
            Some("<=") => Matcher::LessOrEqual,
            Some("<") => Matcher::Less,
            _ => Matcher::Exact,
        }
    }

    /// Returns the operator as written in a manifest (empty for exact)
    pub fn prefix(&self) -> &'static str {
        match self {
            Matcher::Exact => "",
            Matcher::GreaterOrEqual => ">=",
            Matcher::Greater => ">",
            Matcher::LessOrEqual => "<=",
            Matcher::Less => "<",
        }
    }

    /// Returns true if this matcher bounds a range from below
    pub fn is_lower_bound(&self) -> bool {
        matches!(self, Matcher::GreaterOrEqual | Matcher::Greater)
    }

    /// Returns true if this matcher bounds a range from above
    pub fn is_upper_bound(&self) -> bool {
        matches!(self, Matcher::LessOrEqual | Matcher::Less)
    }
}

/// A semantic version with an optional comparison operator
///
/// Ordering is by semantic-version precedence first (numeric identifiers
/// compare numerically, a pre-release sorts before its release), then by
/// matcher so that the order stays total and consistent with equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpecifier {
    matcher: Matcher,
    version: semver::Version,
}

impl VersionSpecifier {
    /// Parses a version specifier, failing on anything that is not semver
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let caps = SPECIFIER_RE.captures(trimmed).ok_or_else(|| {
            VersionError::malformed(input, "expected [MATCHER]MAJOR.MINOR.PATCH[-PRE][+BUILD]")
        })?;

        let number = |name: &str| -> Result<u64, VersionError> {
            caps[name]
                .parse::<u64>()
                .map_err(|e| VersionError::malformed(input, e.to_string()))
        };

        let mut version = semver::Version::new(number("major")?, number("minor")?, number("patch")?);
        if let Some(pre) = caps.name("pre") {
            version.pre = semver::Prerelease::new(pre.as_str())
                .map_err(|e| VersionError::malformed(input, e.to_string()))?;
        }
        if let Some(build) = caps.name("build") {
            version.build = semver::BuildMetadata::new(build.as_str())
                .map_err(|e| VersionError::malformed(input, e.to_string()))?;
        }

        Ok(Self {
            matcher: Matcher::from_prefix(caps.name("matcher").map(|m| m.as_str())),
            version,
        })
    }

    /// Creates an exact specifier for a release version
    pub const fn exact(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            matcher: Matcher::Exact,
            version: semver::Version::new(major, minor, patch),
        }
    }

    /// Returns the same version with a different matcher
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// The comparison operator
    pub fn matcher(&self) -> Matcher {
        self.matcher
    }

    /// The bare semantic version
    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    /// Returns true if this version has a pre-release component
    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    /// Canonical string without the matcher (e.g. `1.2.3-rc.1`)
    pub fn to_version_string(&self) -> String {
        self.version.to_string()
    }

    /// Compares semantic-version precedence only, ignoring matchers
    pub fn cmp_version(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl Ord for VersionSpecifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_version(other)
            .then_with(|| self.matcher.cmp(&other.matcher))
    }
}

impl PartialOrd for VersionSpecifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for VersionSpecifier {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.matcher.prefix(), self.version)
    }
}

impl Serialize for VersionSpecifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionSpecifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
