//! JSON output formatter for machine processing
//!
//! The top-level object always carries `mode`, `file_path`, `upgrades` and
//! `unchanged`; each package is an `{id, version, log}` record.

use crate::domain::{PackageUpgradeRecord, PackageUpgradeResult};
use crate::manifest::LineChange;
use crate::orchestrator::OrchestratorResult;
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// Run mode as reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum JsonMode {
    DryRun,
    Applied,
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput {
    /// `dry_run` or `applied`
    mode: JsonMode,
    /// Path to the manifest file
    file_path: String,
    /// Upgraded packages
    upgrades: Vec<PackageUpgradeRecord>,
    /// Every other package
    unchanged: Vec<PackageUpgradeRecord>,
    /// Upgrades held back for `--force-upgrade` (verbose only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    forced_candidates: Vec<JsonCandidate>,
    /// Rewritten manifest lines (verbose only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    changes: Vec<LineChange>,
    /// Errors encountered
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// An upgrade that needs `--force-upgrade`
#[derive(Serialize)]
struct JsonCandidate {
    /// Package identity
    id: String,
    /// Compatible version outside the declared range
    version: String,
}

fn mode(summary: &PackageUpgradeResult) -> JsonMode {
    if summary.dry_run {
        JsonMode::DryRun
    } else {
        JsonMode::Applied
    }
}

fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    writeln!(writer, "{}", json)
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let summary = &result.summary;
        let verbose = self.verbosity == Verbosity::Verbose;

        let forced_candidates = if verbose {
            summary
                .forced_candidates()
                .filter_map(|r| {
                    r.compatible_version.as_ref().map(|v| JsonCandidate {
                        id: r.id.to_string(),
                        version: v.to_version_string(),
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        let output = JsonOutput {
            mode: mode(summary),
            file_path: summary.file_path.display().to_string(),
            upgrades: summary.upgrade_records(),
            unchanged: summary.unchanged_records(),
            forced_candidates,
            changes: if verbose {
                result.write_result.changes.clone()
            } else {
                Vec::new()
            },
            errors: result.errors().to_vec(),
        };

        write_json(&output, writer)
    }
}
