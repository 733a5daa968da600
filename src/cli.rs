//! CLI argument parsing module for fusionup

use clap::Parser;
use std::path::PathBuf;

/// Fusion compatibility and upgrade advisor for dbt packages
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fusionup",
    version,
    about = "Fusion compatibility and upgrade advisor for dbt packages"
)]
pub struct CliArgs {
    /// dbt project directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    // General options
    /// Dry run mode - show what would be upgraded without changing the manifest
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Also upgrade packages whose compatible version is outside the declared range
    #[arg(long)]
    pub force_upgrade: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,

    // Knowledge base options
    /// Fusion compatibility snapshot to use (file path or http(s) URL)
    #[arg(long, value_name = "PATH|URL")]
    pub knowledge_base: Option<String>,

    /// Timeout in seconds for fetching the knowledge base
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Config file to use instead of <PATH>/.fusionup.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,
}

impl CliArgs {
    /// Returns true if progress spinners should be drawn
    pub fn shows_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}
