//! Rendering of a finished run
//!
//! Text goes to a terminal, JSON to other tools. Both render the same
//! `OrchestratorResult`.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::orchestrator::OrchestratorResult;
use std::io::Write;

/// How much detail to print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Counts line only
    Quiet,
    Normal,
    /// Adds decision notes, latest versions and forced candidates
    Verbose,
}

/// Formatter selection resolved from the command line
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub json: bool,
    pub verbosity: Verbosity,
    pub dry_run: bool,
    /// Colors apply to text output only
    pub color: bool,
}

impl OutputConfig {
    /// Create configuration from CLI arguments; `quiet` wins over `verbose`
    pub fn from_cli(json: bool, verbose: bool, quiet: bool, dry_run: bool) -> Self {
        let verbosity = match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        };
        Self {
            json,
            verbosity,
            dry_run,
            color: true,
        }
    }

    /// Enable or disable colors (builder pattern)
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// Renders a finished run
pub trait OutputFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Picks the formatter for the configuration
pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    if config.json {
        Box::new(JsonFormatter::new(config.verbosity))
    } else {
        Box::new(TextFormatter::new(config.verbosity, config.dry_run, config.color))
    }
}
