//! Version ranges built from one or more version specifiers
//!
//! A range is the intersection of every specifier it was built from:
//! `[">=1.0.0", "<2.0.0"]` and `">=1.0.0, <2.0.0"` both become `[1.0.0, 2.0.0)`.
//! When two specifiers bound the same side, the tighter one governs.

use super::version_spec::{Matcher, VersionSpecifier};
use crate::error::VersionError;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// The engine version a package must accept to run on Fusion
pub const FUSION_VERSION: VersionSpecifier = VersionSpecifier::exact(2, 0, 0);

/// An interval of acceptable versions
///
/// `start` carries a `>=` or `>` matcher, `end` a `<=` or `<` matcher.
/// A missing bound is open on that side; a range with no bounds accepts every
/// version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionRange {
    start: Option<VersionSpecifier>,
    end: Option<VersionSpecifier>,
}

impl VersionRange {
    /// A range accepting every version
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The range accepted by a single specifier
    pub fn from_specifier(spec: &VersionSpecifier) -> Self {
        match spec.matcher() {
            Matcher::Exact => Self {
                start: Some(spec.clone().with_matcher(Matcher::GreaterOrEqual)),
                end: Some(spec.clone().with_matcher(Matcher::LessOrEqual)),
            },
            m if m.is_lower_bound() => Self {
                start: Some(spec.clone()),
                end: None,
            },
            _ => Self {
                start: None,
                end: Some(spec.clone()),
            },
        }
    }

    /// Collapses specifiers into the single range all of them accept
    ///
    /// No specifiers yields the unbounded range. Specifiers that leave no
    /// acceptable version fail with [`VersionError::EmptyRange`].
    pub fn from_specifiers(specs: &[VersionSpecifier]) -> Result<Self, VersionError> {
        let range = specs
            .iter()
            .fold(Self::unbounded(), |acc, spec| acc.intersect(&Self::from_specifier(spec)));

        if range.is_empty() {
            return Err(VersionError::EmptyRange {
                specifiers: specs
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        Ok(range)
    }

    /// Parses raw constraint strings, each of which may hold several
    /// comma-separated specifiers
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, VersionError> {
        let specs = raw
            .iter()
            .flat_map(|r| r.as_ref().split(','))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(VersionSpecifier::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_specifiers(&specs)
    }

    /// Lower bound, if any
    pub fn start(&self) -> Option<&VersionSpecifier> {
        self.start.as_ref()
    }

    /// Upper bound, if any
    pub fn end(&self) -> Option<&VersionSpecifier> {
        self.end.as_ref()
    }

    /// Returns true if no version is excluded
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Returns true if `version` lies inside the interval; exclusive bounds
    /// are obeyed strictly
    pub fn contains(&self, version: &VersionSpecifier) -> bool {
        let above_start = match &self.start {
            None => true,
            Some(start) => match version.cmp_version(start) {
                Ordering::Greater => true,
                Ordering::Equal => start.matcher() == Matcher::GreaterOrEqual,
                Ordering::Less => false,
            },
        };
        let below_end = match &self.end {
            None => true,
            Some(end) => match version.cmp_version(end) {
                Ordering::Less => true,
                Ordering::Equal => end.matcher() == Matcher::LessOrEqual,
                Ordering::Greater => false,
            },
        };
        above_start && below_end
    }

    /// Returns true if this range accepts the Fusion engine version
    pub fn includes_fusion(&self) -> bool {
        self.contains(&FUSION_VERSION)
    }

    /// Intersection of two ranges, keeping the tighter bound on each side
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            start: tighter(self.start.as_ref(), other.start.as_ref(), Ordering::Greater),
            end: tighter(self.end.as_ref(), other.end.as_ref(), Ordering::Less),
        }
    }

    fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => match start.cmp_version(end) {
                Ordering::Greater => true,
                Ordering::Equal => {
                    start.matcher() != Matcher::GreaterOrEqual || end.matcher() != Matcher::LessOrEqual
                }
                Ordering::Less => false,
            },
            _ => false,
        }
    }
}

/// Picks the bound that excludes more: further in the `wins` direction, or the
/// exclusive one when both sit on the same version
fn tighter(
    a: Option<&VersionSpecifier>,
    b: Option<&VersionSpecifier>,
    wins: Ordering,
) -> Option<VersionSpecifier> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (Some(x), Some(y)) => {
            let ord = x.cmp_version(y);
            if ord == wins {
                Some(x.clone())
            } else if ord == Ordering::Equal {
                let x_exclusive = matches!(x.matcher(), Matcher::Greater | Matcher::Less);
                Some(if x_exclusive { x.clone() } else { y.clone() })
            } else {
                Some(y.clone())
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.start, &self.end) {
            (None, None) => write!(f, "any"),
            (Some(start), Some(end))
                if start.cmp_version(end) == Ordering::Equal
                    && start.matcher() == Matcher::GreaterOrEqual =>
            {
                write!(f, "{}", start.to_version_string())
            }
            (Some(start), Some(end)) => write!(f, "{}, {}", start, end),
            (Some(start), None) => write!(f, "{}", start),
            (None, Some(end)) => write!(f, "{}", end),
        }
    }
}
