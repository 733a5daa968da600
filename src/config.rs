//! Run configuration
//!
//! Settings come from three layers, highest precedence first: command-line
//! options, the project's `.fusionup.toml`, then built-in defaults.

use crate::cli::CliArgs;
use crate::error::ConfigError;
use crate::knowledge_base::{Overrides, SourceSpec, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Config file looked up at the project root
pub const CONFIG_FILE_NAME: &str = ".fusionup.toml";

/// Contents of `.fusionup.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// `[knowledge_base]` table
    pub knowledge_base: KnowledgeBaseConfig,
    /// `[overrides]` table
    pub overrides: OverridesConfig,
}

/// `[knowledge_base]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnowledgeBaseConfig {
    /// File path or http(s) URL of the snapshot
    pub source: Option<String>,
    /// Fetch timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// `[overrides]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverridesConfig {
    /// Identities treated as Fusion-compatible
    pub allow: Vec<String>,
    /// Identities treated as Fusion-incompatible
    pub disallow: Vec<String>,
}

impl FileConfig {
    /// Parses a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads the explicit config file, or the project's one if present
    ///
    /// A missing explicit file is an error; a missing project file is not.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            debug!(path = %path.display(), "loading project config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Project root
    pub root: PathBuf,
    /// Report only, never write the manifest
    pub dry_run: bool,
    /// Also apply upgrades outside the declared range
    pub force_upgrade: bool,
    /// Where to load the knowledge base from
    pub source: SourceSpec,
    /// Knowledge base fetch timeout
    pub timeout: Duration,
    /// Overrides from the config file
    pub overrides: Overrides,
}

impl Settings {
    /// Merges command-line options over the config file and defaults
    pub fn resolve(args: &CliArgs) -> Result<Self, ConfigError> {
        if args.quiet && args.verbose {
            return Err(ConfigError::ConflictingOptions {
                message: "--quiet and --verbose cannot be used together".to_string(),
            });
        }
        let file = FileConfig::discover(&args.path, args.config.as_deref())?;
        Self::from_layers(args, file)
    }

    fn from_layers(args: &CliArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let source = match args
            .knowledge_base
            .as_deref()
            .or(file.knowledge_base.source.as_deref())
        {
            Some(value) => SourceSpec::parse(value)?,
            None => SourceSpec::None,
        };
        let source = match source {
            SourceSpec::File(path) if path.is_relative() && args.knowledge_base.is_none() => {
                SourceSpec::File(args.path.join(path))
            }
            other => other,
        };

        let timeout = args
            .timeout
            .or(file.knowledge_base.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self {
            root: args.path.clone(),
            dry_run: args.dry_run,
            force_upgrade: args.force_upgrade,
            source,
            timeout,
            overrides: Overrides::new(file.overrides.allow, file.overrides.disallow),
        })
    }
}
