//! Fusion compatibility states

use serde::{Deserialize, Serialize};
use std::fmt;

/// What is known about a package's (or one installed version's) Fusion support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FusionCompatibilityState {
    /// Listed as compatible by manual override, all versions
    ExplicitAllow,
    /// Listed as incompatible by manual override, all versions
    ExplicitDisallow,
    /// `require-dbt-version` accepts 2.0.0
    #[serde(rename = "DBT_VERSION_RANGE_INCLUDES_2_0")]
    DbtVersionRangeIncludes2_0,
    /// `require-dbt-version` excludes 2.0.0
    #[serde(rename = "DBT_VERSION_RANGE_EXCLUDES_2_0")]
    DbtVersionRangeExcludes2_0,
    /// No version declares eligibility either way
    NoDbtVersionRange,
    /// No evidence at all
    #[default]
    Unknown,
}

impl FusionCompatibilityState {
    /// Human-readable explanation of the state
    pub fn description(&self) -> &'static str {
        match self {
            FusionCompatibilityState::ExplicitAllow => {
                "Package is manually verified as compatible with Fusion"
            }
            FusionCompatibilityState::ExplicitDisallow => {
                "Package is manually verified as not compatible with Fusion"
            }
            FusionCompatibilityState::DbtVersionRangeIncludes2_0 => {
                "require-dbt-version includes 2.0.0"
            }
            FusionCompatibilityState::DbtVersionRangeExcludes2_0 => {
                "require-dbt-version excludes 2.0.0"
            }
            FusionCompatibilityState::NoDbtVersionRange => "require-dbt-version is not defined",
            FusionCompatibilityState::Unknown => "Fusion compatibility is unknown",
        }
    }

    /// Returns true if the state means the package runs on Fusion
    pub fn is_compatible(&self) -> bool {
        matches!(
            self,
            FusionCompatibilityState::ExplicitAllow
                | FusionCompatibilityState::DbtVersionRangeIncludes2_0
        )
    }

    /// Returns true if the state means the package cannot run on Fusion
    pub fn is_incompatible(&self) -> bool {
        matches!(
            self,
            FusionCompatibilityState::ExplicitDisallow
                | FusionCompatibilityState::DbtVersionRangeExcludes2_0
        )
    }
}

impl fmt::Display for FusionCompatibilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
