//! CLI argument parsing using clap

use super::MetricsFormat;
use crate::error::SearchError;
use clap::Parser;
use std::path::PathBuf;

/// sqsearch - find runs of k consecutive squares that sum to a perfect square
#[derive(Parser, Debug)]
#[command(name = "sqsearch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Search upper bound: starting points 1..=N are tested
    #[arg(value_name = "N", value_parser = parse_positive)]
    pub n: Option<u64>,

    /// Number of consecutive squares in each run
    #[arg(value_name = "K", value_parser = parse_positive)]
    pub k: Option<u64>,

    /// TOML configuration file (CLI arguments take precedence)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // === Worker Options ===
    /// Number of worker threads (default: number of CPUs)
    #[arg(short = 't', long, env = "SQSEARCH_THREADS")]
    pub threads: Option<usize>,

    /// Candidates per work unit (default: a few units per thread)
    #[arg(short = 'u', long, value_parser = parse_positive)]
    pub unit_size: Option<u64>,

    /// Completion deadline (e.g. 30s, 500ms, 5m); scaled to N when omitted
    #[arg(long)]
    pub timeout: Option<String>,

    // === Output Options ===
    /// Write a metrics report (metrics_N{N}_k{K}.txt)
    #[arg(short = 'm', long)]
    pub metrics: bool,

    /// Directory for the metrics report
    #[arg(long, value_name = "DIR")]
    pub metrics_dir: Option<PathBuf>,

    /// Metrics report format
    #[arg(long, value_enum)]
    pub metrics_format: Option<MetricsFormat>,

    /// Print only the solutions
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.threads == Some(0) {
            return Err(SearchError::invalid("threads must be at least 1").into());
        }
        if self.config.is_none() && (self.n.is_none() || self.k.is_none()) {
            return Err(SearchError::invalid("N and K are required").into());
        }
        Ok(())
    }
}

/// Parse a strictly positive integer argument
///
/// # Examples
///
/// ```
/// use sqsearch::config::cli::parse_positive;
///
/// assert_eq!(parse_positive("42").unwrap(), 42);
/// assert!(parse_positive("0").is_err());
/// assert!(parse_positive("forty").is_err());
/// ```
pub fn parse_positive(s: &str) -> Result<u64, SearchError> {
    let value: u64 = s
        .trim()
        .parse()
        .map_err(|_| SearchError::invalid(format!("'{}' is not a positive integer", s)))?;
    if value == 0 {
        return Err(SearchError::invalid("value must be at least 1"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_positionals() {
        let cli = Cli::try_parse_from(["sqsearch", "25", "2"]).unwrap();
        assert_eq!(cli.n, Some(25));
        assert_eq!(cli.k, Some(2));
        assert!(!cli.metrics);
        cli.validate().unwrap();
    }

    #[test]
    fn test_parse_options() {
        let cli = Cli::try_parse_from([
            "sqsearch",
            "1000",
            "24",
            "--threads",
            "3",
            "--unit-size",
            "50",
            "--timeout",
            "10s",
            "--metrics",
            "--metrics-format",
            "json",
            "-q",
        ])
        .unwrap();
        assert_eq!(cli.threads, Some(3));
        assert_eq!(cli.unit_size, Some(50));
        assert_eq!(cli.timeout.as_deref(), Some("10s"));
        assert!(cli.metrics);
        assert_eq!(cli.metrics_format, Some(MetricsFormat::Json));
        assert!(cli.quiet);
    }

    #[test]
    fn test_non_integer_rejected() {
        assert!(Cli::try_parse_from(["sqsearch", "abc", "2"]).is_err());
        assert!(Cli::try_parse_from(["sqsearch", "10", "2.5"]).is_err());
        assert!(Cli::try_parse_from(["sqsearch", "-3", "2"]).is_err());
    }

    #[test]
    fn test_zero_rejected() {
        assert!(Cli::try_parse_from(["sqsearch", "0", "2"]).is_err());
        assert!(Cli::try_parse_from(["sqsearch", "10", "0"]).is_err());
    }

    #[test]
    fn test_missing_arguments_fail_validation() {
        let cli = Cli::try_parse_from(["sqsearch", "10"]).unwrap();
        let err = cli.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SearchError>(),
            Some(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive(" 7 ").unwrap(), 7);
        assert!(matches!(
            parse_positive("x"),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_positive("0"),
            Err(SearchError::InvalidArgument(_))
        ));
    }
}
