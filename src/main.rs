//! fusionup - Fusion compatibility and upgrade advisor CLI tool
//!
//! Reports which dbt package dependencies already run on Fusion and rewrites
//! the manifest to the nearest Fusion-compatible version.

use clap::Parser;
use fusionup::cli::CliArgs;
use fusionup::config::Settings;
use fusionup::orchestrator::Orchestrator;
use fusionup::output::{create_formatter, OutputConfig};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(&args);

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr; `RUST_LOG` wins over the CLI flags
fn init_tracing(args: &CliArgs) {
    let default_level = if args.quiet {
        "error"
    } else if args.verbose {
        "fusionup=debug"
    } else {
        "warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_ansi(io::stderr().is_terminal()),
        )
        .try_init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let settings = Settings::resolve(&args)?;

    if args.verbose {
        eprintln!("fusionup v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Project: {}", settings.root.display());
        eprintln!("Knowledge base: {}", settings.source);
        if args.dry_run {
            eprintln!("Mode: dry-run");
        }
    }

    // Create and run the orchestrator
    let orchestrator = Orchestrator::new(settings).with_progress(args.shows_progress());
    let result = orchestrator.run().await?;

    // Create output formatter based on CLI options
    let output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet, args.dry_run)
        .with_color(io::stdout().is_terminal());
    let formatter = create_formatter(output_config);

    let mut stdout = io::stdout().lock();
    formatter.format(&result, &mut stdout)?;
    stdout.flush()?;

    if result.has_errors() {
        // Partial success - some upgrades could not be written
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
