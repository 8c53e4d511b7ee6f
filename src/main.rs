//! sqsearch CLI entry point
//!
//! Exit status: 0 for a complete run, 1 on runtime failure, 2 on invalid
//! arguments (with usage text), 3 when the printed solutions are partial.

use anyhow::Result;
use clap::CommandFactory;
use sqsearch::config::cli::Cli;
use sqsearch::config::toml::load_config;
use sqsearch::config::validator::validate_config;
use sqsearch::coordinator::{Coordinator, RunOutcome, SearchJob};
use sqsearch::output::{metrics, text};
use sqsearch::util::resource::ResourceSnapshot;
use sqsearch::SearchError;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 1;
const EXIT_INVALID_ARGUMENT: u8 = 2;
const EXIT_PARTIAL: u8 = 3;

fn main() -> ExitCode {
    // Parse errors (non-integer N/K, unknown flags) exit with usage here
    let cli = Cli::parse_args();

    match run(&cli) {
        Ok(outcome) if outcome.is_partial() => ExitCode::from(EXIT_PARTIAL),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

/// Load configuration, run the search and hand the outcome to the printers
fn run(cli: &Cli) -> Result<RunOutcome> {
    cli.validate()?;

    let config = load_config(cli)?;
    init_logging(config.output.verbose);
    validate_config(&config)?;
    debug!("{}", config);

    let job = SearchJob::from_config(&config)?;

    let before = ResourceSnapshot::take();
    let outcome = Coordinator::new(job).run()?;
    let usage = match (before, ResourceSnapshot::take()) {
        (Some(before), Some(after)) => Some(after.usage_since(&before)),
        _ => None,
    };

    text::print_results(&outcome, usage.as_ref(), &config.output)?;

    if config.output.metrics {
        let path = metrics::write_metrics(
            &outcome,
            usage.as_ref(),
            &config.output.metrics_dir,
            config.output.metrics_format,
        )?;
        if !config.output.quiet {
            eprintln!("Metrics written to {}", path.display());
        }
    }

    Ok(outcome)
}

/// Logging goes to stderr; RUST_LOG overrides the default filter
fn init_logging(verbose: bool) {
    let default = if verbose {
        "sqsearch=debug"
    } else {
        "sqsearch=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<SearchError>() {
        Some(SearchError::InvalidArgument(_)) => {
            eprintln!("error: {}", err);
            eprintln!();
            eprintln!("{}", Cli::command().render_usage());
            ExitCode::from(EXIT_INVALID_ARGUMENT)
        }
        _ => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
