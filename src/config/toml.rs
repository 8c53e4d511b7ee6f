//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::error::SearchError;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Build the run configuration: TOML file (if any) overlaid with CLI arguments
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, base)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    if let Some(n) = cli.n {
        config.search.n = Some(n);
    }
    if let Some(k) = cli.k {
        config.search.k = Some(k);
    }

    if let Some(threads) = cli.threads {
        config.workers.threads = Some(threads);
    }
    if let Some(unit_size) = cli.unit_size {
        config.workers.unit_size = Some(unit_size);
    }

    if let Some(timeout) = &cli.timeout {
        parse_duration(timeout)
            .map_err(|e| SearchError::invalid(format!("--timeout: {:#}", e)))?;
        config.runtime.timeout = Some(timeout.clone());
    }

    // Flags can only switch features on
    if cli.metrics {
        config.output.metrics = true;
    }
    if let Some(dir) = &cli.metrics_dir {
        config.output.metrics_dir = dir.clone();
        config.output.metrics = true;
    }
    if let Some(format) = cli.metrics_format {
        config.output.metrics_format = format;
    }
    if cli.quiet {
        config.output.quiet = true;
    }
    if cli.verbose {
        config.output.verbose = true;
    }

    Ok(config)
}

/// Parse duration string (e.g., "500ms", "60s", "5m", "1h")
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (num_str, unit) = s.split_at(split);

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid number in duration: {}", s))?;

    let duration = match unit.trim() {
        "" | "s" => Duration::from_secs(num),
        "ms" => Duration::from_millis(num),
        "m" => Duration::from_secs(num.saturating_mul(60)),
        "h" => Duration::from_secs(num.saturating_mul(3600)),
        other => anyhow::bail!("Invalid duration unit: {}. Use ms, s, m, or h", other),
    };

    Ok(duration)
}
