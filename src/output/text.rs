//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Upgrades with semantic version change type (major/minor/patch)
//! - Unchanged packages grouped by decision reason
//! - Decision notes, latest versions and rewritten lines in verbose mode
//! - A summary with follow-up hints

use crate::domain::{
    PackageUpgradeResult, PackageVersionUpgradeResult, PackageVersionUpgradeType, VersionSpecifier,
};
use crate::orchestrator::OrchestratorResult;
use crate::output::{OutputFormatter, Verbosity};
use colored::{ColoredString, Colorize};
use std::io::Write;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Unknown or unparseable
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    pub fn from_versions(old: &str, new: &str) -> Self {
        match (VersionSpecifier::parse(old), VersionSpecifier::parse(new)) {
            (Ok(old), Ok(new)) => {
                let (old, new) = (old.version(), new.version());
                if new.major != old.major {
                    VersionChangeType::Major
                } else if new.minor != old.minor {
                    VersionChangeType::Minor
                } else {
                    VersionChangeType::Patch
                }
            }
            _ => VersionChangeType::Unknown,
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }

    /// Get the plain label
    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Order and headings of the unchanged groups
const UNCHANGED_GROUPS: &[(PackageVersionUpgradeType, &str)] = &[
    (
        PackageVersionUpgradeType::PublicPackageFusionCompatibleVersionExceedsProjectConfig,
        "Compatible version outside the declared range",
    ),
    (
        PackageVersionUpgradeType::UpgradeAvailable,
        "Upgrade available",
    ),
    (
        PackageVersionUpgradeType::PublicPackageNotCompatibleWithFusion,
        "Not compatible with Fusion",
    ),
    (
        PackageVersionUpgradeType::PublicPackageMissingFusionEligibility,
        "Missing Fusion eligibility",
    ),
    (
        PackageVersionUpgradeType::PrivatePackageMissingRequireDbtVersion,
        "Private packages",
    ),
    (
        PackageVersionUpgradeType::NoUpgradeRequired,
        "Already compatible",
    ),
];

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether this is a dry-run
    dry_run: bool,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity, dry_run: bool, color: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color,
        }
    }

    /// Applies a style only when colors are enabled
    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Get the dry-run prefix if applicable
    fn dry_run_prefix(&self) -> String {
        if self.dry_run {
            format!("{} ", self.paint("(dry-run)", |s| s.cyan()))
        } else {
            String::new()
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Calculate the maximum package id length for alignment
    fn max_id_length<'a>(&self, results: impl Iterator<Item = &'a PackageVersionUpgradeResult>) -> usize {
        results.map(|r| r.id.as_str().len()).max().unwrap_or(0).max(20)
    }

    /// Format a single upgrade line
    fn format_upgrade_line(
        &self,
        result: &PackageVersionUpgradeResult,
        width: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let new_version = result.package_final_version();
        let change_type = VersionChangeType::from_versions(&result.previous_version, &new_version);

        if self.color {
            writeln!(
                writer,
                "  {} {} {} {} [{}]",
                format!("{:width$}", result.id.as_str(), width = width),
                result.previous_version.dimmed(),
                "→".dimmed(),
                new_version.bright_white().bold(),
                change_type.colored_label()
            )
        } else {
            writeln!(
                writer,
                "  {:width$} {} -> {} [{}]",
                result.id.as_str(),
                result.previous_version,
                new_version,
                change_type.label(),
                width = width
            )
        }
    }

    /// Format a single unchanged line
    fn format_unchanged_line(
        &self,
        result: &PackageVersionUpgradeResult,
        width: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let id = format!("{:width$}", result.id.as_str(), width = width);
        let candidate = result
            .compatible_version
            .as_ref()
            .map(|v| format!(" (compatible: {})", v.to_version_string()))
            .unwrap_or_default();

        writeln!(
            writer,
            "  {} {}{}",
            self.paint(&id, |s| s.normal()),
            self.paint(&result.previous_version, |s| s.dimmed()),
            self.paint(&candidate, |s| s.yellow())
        )
    }

    /// Notes and latest version, indented under a package line
    fn format_details(
        &self,
        result: &PackageVersionUpgradeResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if !self.is_verbose() {
            return Ok(());
        }
        for note in &result.notes {
            writeln!(writer, "      {}", self.paint(note, |s| s.dimmed()))?;
        }
        if let Some(latest) = &result.latest_version {
            let line = format!("latest: {}", latest.to_version_string());
            writeln!(writer, "      {}", self.paint(&line, |s| s.dimmed()))?;
        }
        Ok(())
    }

    /// Header line with the manifest path and counts
    fn format_header(&self, summary: &PackageUpgradeResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let upgrades = summary.upgrade_count();
        let unchanged = summary.unchanged_count();
        writeln!(
            writer,
            "{}{}: {} {}, {} unchanged",
            self.dry_run_prefix(),
            self.paint(&summary.file_path.display().to_string(), |s| s.bold()),
            self.paint(&upgrades.to_string(), |s| s.green()),
            if upgrades == 1 { "upgrade" } else { "upgrades" },
            unchanged
        )
    }

    fn format_group_heading(&self, heading: &str, writer: &mut dyn Write) -> std::io::Result<()> {
        writeln!(writer)?;
        writeln!(writer, "{}", self.paint(heading, |s| s.bold().underline()))
    }

    /// Upgrades followed by unchanged packages grouped by reason
    fn format_groups(&self, summary: &PackageUpgradeResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let width = self.max_id_length(summary.all_results());

        if summary.has_upgrades() {
            let heading = if self.dry_run { "Would upgrade" } else { "Upgraded" };
            self.format_group_heading(heading, writer)?;
            for result in &summary.upgrades {
                self.format_upgrade_line(result, width, writer)?;
                self.format_details(result, writer)?;
            }
        }

        for (reason, heading) in UNCHANGED_GROUPS {
            let group: Vec<_> = summary
                .unchanged
                .iter()
                .filter(|r| r.version_reason == *reason)
                .collect();
            if group.is_empty() {
                continue;
            }
            self.format_group_heading(heading, writer)?;
            if self.is_verbose() {
                writeln!(writer, "  {}", self.paint(reason.description(), |s| s.dimmed()))?;
            }
            for result in group {
                self.format_unchanged_line(result, width, writer)?;
                self.format_details(result, writer)?;
            }
        }
        Ok(())
    }

    /// Rewritten manifest lines
    fn format_changes(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let changes = &result.write_result.changes;
        if changes.is_empty() || !(self.dry_run || self.is_verbose()) {
            return Ok(());
        }
        self.format_group_heading("Manifest changes", writer)?;
        for change in changes {
            for line in &change.removed {
                writeln!(writer, "{}", self.paint(&format!("- {}", line), |s| s.red()))?;
            }
            writeln!(writer, "{}", self.paint(&format!("+ {}", change.added), |s| s.green()))?;
        }
        Ok(())
    }

    /// Writes the counts line, followed by hints unless quiet
    fn format_summary(&self, summary: &PackageUpgradeResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let verb = if self.dry_run { "would be upgraded" } else { "upgraded" };
        writeln!(
            writer,
            "{}{} {} {}, {} unchanged",
            self.dry_run_prefix(),
            self.paint(&summary.upgrade_count().to_string(), |s| s.green().bold()),
            if summary.upgrade_count() == 1 { "package" } else { "packages" },
            verb,
            summary.unchanged_count()
        )?;

        if self.verbosity == Verbosity::Quiet {
            return Ok(());
        }
        let forced = summary.forced_candidates().count();
        if forced > 0 {
            let hint = format!(
                "{} compatible {} outside the declared range, run with --force-upgrade to apply",
                forced,
                if forced == 1 { "version is" } else { "versions are" }
            );
            writeln!(writer, "{}", self.paint(&hint, |s| s.yellow()))?;
        }
        if self.dry_run && summary.has_upgrades() {
            writeln!(
                writer,
                "{}",
                self.paint("Run without --dry-run to update the manifest", |s| s.dimmed())
            )?;
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Quiet {
            return self.format_summary(&result.summary, writer);
        }

        self.format_header(&result.summary, writer)?;
        if self.is_verbose() {
            let format = format!("format: {}", result.summary.kind.display_name());
            writeln!(writer, "{}", self.paint(&format, |s| s.dimmed()))?;
            let generated = result
                .knowledge_base_generated_at
                .map(|d| format!(", generated {}", d.format("%Y/%m/%d %H:%M")))
                .unwrap_or_default();
            let line = format!(
                "knowledge base: {} packages{}",
                result.knowledge_base_size, generated
            );
            writeln!(writer, "{}", self.paint(&line, |s| s.dimmed()))?;
        }
        self.format_groups(&result.summary, writer)?;
        self.format_changes(result, writer)?;

        for error in result.errors() {
            writeln!(writer, "{} {}", self.paint("error:", |s| s.red().bold()), error)?;
        }

        writeln!(writer)?;
        self.format_summary(&result.summary, writer)
    }
}
