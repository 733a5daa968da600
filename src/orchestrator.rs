//! Upgrade orchestrator for coordinating the whole run
//!
//! This module provides:
//! - Workflow coordination: load manifest → scan installed → load knowledge
//!   base → merge → judge → apply → write
//! - Dry-run mode support
//! - Degradation to an empty knowledge base when it cannot be loaded

use crate::config::Settings;
use crate::domain::PackageUpgradeResult;
use crate::error::AppError;
use crate::installed::scan_installed_packages;
use crate::knowledge_base::{load_knowledge_base, EmptySource, KnowledgeBaseSource};
use crate::manifest::{DbtPackageFile, ManifestWriter, WriteResult};
use crate::progress::Progress;
use crate::update::{check_for_package_upgrades, upgrade_package_versions};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Orchestrator for coordinating the upgrade workflow
pub struct Orchestrator {
    /// Resolved settings
    settings: Settings,
    /// Whether to draw spinners
    show_progress: bool,
}

/// Result of running the orchestrator
#[derive(Debug)]
pub struct OrchestratorResult {
    /// Per-package decisions, grouped by outcome
    pub summary: PackageUpgradeResult,
    /// Outcome of rewriting the manifest
    pub write_result: WriteResult,
    /// When the knowledge base snapshot was generated, if known
    pub knowledge_base_generated_at: Option<DateTime<Utc>>,
    /// Number of entries in the knowledge base
    pub knowledge_base_size: usize,
}

impl OrchestratorResult {
    /// Returns true if some upgrades could not be written
    pub fn has_errors(&self) -> bool {
        self.write_result.has_errors()
    }

    /// Non-fatal errors encountered while writing
    pub fn errors(&self) -> &[String] {
        &self.write_result.errors
    }
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            show_progress: false,
        }
    }

    /// Enable or disable spinners (builder pattern)
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run the workflow against the configured knowledge base source
    pub async fn run(&self) -> Result<OrchestratorResult, AppError> {
        let source: Box<dyn KnowledgeBaseSource> =
            match self.settings.source.clone().into_source(self.settings.timeout) {
                Ok(source) => source,
                Err(e) => {
                    warn!(error = %e, "cannot create knowledge base source, continuing without it");
                    Box::new(EmptySource)
                }
            };
        self.run_with_source(source.as_ref()).await
    }

    /// Run the workflow against an explicit knowledge base source
    ///
    /// Manifest errors abort the run before any package is judged.
    pub async fn run_with_source(
        &self,
        source: &dyn KnowledgeBaseSource,
    ) -> Result<OrchestratorResult, AppError> {
        let mut progress = Progress::new(self.show_progress);
        let root = &self.settings.root;

        // Step 1: Load the manifest
        progress.spinner("Reading manifest...");
        let loaded = DbtPackageFile::load(root);
        progress.finish_and_clear();
        let mut package_file = loaded?;
        info!(path = %package_file.path().display(), packages = package_file.len(), "loaded manifest");

        // Step 2: Scan installed packages
        progress.spinner("Scanning installed packages...");
        let installed = scan_installed_packages(root);
        progress.finish_and_clear();

        // Step 3: Load the knowledge base
        progress.spinner(&format!("Loading knowledge base from {}...", source.source_name()));
        let knowledge_base = load_knowledge_base(source)
            .await
            .with_overrides(self.settings.overrides.clone());
        progress.finish_and_clear();

        // Step 4: Merge and judge
        package_file.merge_installed_versions(&installed, &knowledge_base);
        let results = check_for_package_upgrades(&package_file, &knowledge_base);
        let mut summary = upgrade_package_versions(
            &package_file,
            results,
            self.settings.force_upgrade,
            self.settings.dry_run,
        );

        // Step 5: Rewrite the manifest (reported only in dry-run mode)
        if !self.settings.dry_run && summary.has_upgrades() {
            progress.spinner("Writing upgrades...");
        }
        let writer = ManifestWriter::new(self.settings.dry_run);
        let written = writer.apply_upgrades(&summary);
        progress.finish_and_clear();
        let write_result = written?;
        summary.upgraded = write_result.file_modified;
        if write_result.has_errors() {
            warn!(errors = write_result.errors.len(), "some upgrades could not be written");
        }

        Ok(OrchestratorResult {
            summary,
            write_result,
            knowledge_base_generated_at: knowledge_base.generated_at(),
            knowledge_base_size: knowledge_base.len(),
        })
    }
}
