//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! CLI values take precedence over the TOML file; anything left unset falls
//! back to the defaults below.

pub mod cli;
pub mod toml;
pub mod validator;

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Problem definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search upper bound (inclusive)
    pub n: Option<u64>,
    /// Number of consecutive squares
    pub k: Option<u64>,
}

/// Worker pool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker threads (defaults to the CPU count)
    pub threads: Option<usize>,
    /// Candidates per work unit (defaults to a few units per thread)
    pub unit_size: Option<u64>,
}

impl WorkerConfig {
    /// Configured thread count, or one per CPU
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Fixed completion deadline (e.g. "30s", "500ms", "5m"); scaled to the
    /// problem size when unset
    pub timeout: Option<String>,
}

impl RuntimeConfig {
    /// Parsed `timeout`, if one is configured
    pub fn timeout_duration(&self) -> Result<Option<Duration>> {
        self.timeout
            .as_deref()
            .map(toml::parse_duration)
            .transpose()
    }
}

/// Metrics report format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// Plain-text report
    #[default]
    Text,
    /// JSON document
    Json,
}

impl MetricsFormat {
    pub fn extension(self) -> &'static str {
        match self {
            MetricsFormat::Text => "txt",
            MetricsFormat::Json => "json",
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write a metrics report after the run
    #[serde(default)]
    pub metrics: bool,
    /// Directory the metrics report is written to
    #[serde(default = "default_metrics_dir")]
    pub metrics_dir: PathBuf,
    #[serde(default)]
    pub metrics_format: MetricsFormat,
    /// Print only the solutions (no summary)
    #[serde(default)]
    pub quiet: bool,
    /// Debug-level logging
    #[serde(default)]
    pub verbose: bool,
}

fn default_metrics_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metrics: false,
            metrics_dir: default_metrics_dir(),
            metrics_format: MetricsFormat::default(),
            quiet: false,
            verbose: false,
        }
    }
}

// Display trait implementations

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Search: {}", self.search)?;
        writeln!(f, "  Workers: {}", self.workers)?;
        writeln!(f, "  Runtime: {}", self.runtime)?;
        writeln!(f, "  Output: {}", self.output)?;
        Ok(())
    }
}

fn fmt_opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "unset".to_string(),
    }
}

impl fmt::Display for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N={}, k={}", fmt_opt(&self.n), fmt_opt(&self.k))
    }
}

impl fmt::Display for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "threads={}", self.effective_threads())?;
        match self.unit_size {
            Some(size) => write!(f, ", unit_size={}", size),
            None => write!(f, ", unit_size=auto"),
        }
    }
}

impl fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.timeout {
            Some(t) => write!(f, "timeout={}", t),
            None => write!(f, "timeout=scaled"),
        }
    }
}

impl fmt::Display for OutputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.metrics {
            write!(
                f,
                "metrics={} ({:?})",
                self.metrics_dir.display(),
                self.metrics_format
            )?;
        } else {
            write!(f, "metrics=off")?;
        }
        if self.quiet {
            write!(f, ", quiet")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.search.n.is_none());
        assert!(config.workers.effective_threads() >= 1);
        assert_eq!(config.output.metrics_dir, PathBuf::from("."));
        assert_eq!(config.output.metrics_format, MetricsFormat::Text);
        assert!(config.runtime.timeout_duration().unwrap().is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let runtime = RuntimeConfig {
            timeout: Some("250ms".to_string()),
        };
        assert_eq!(
            runtime.timeout_duration().unwrap(),
            Some(Duration::from_millis(250))
        );

        let bad = RuntimeConfig {
            timeout: Some("soon".to_string()),
        };
        assert!(bad.timeout_duration().is_err());
    }

    #[test]
    fn test_display() {
        let mut config = Config::default();
        config.search.n = Some(25);
        config.search.k = Some(2);
        config.workers.threads = Some(4);
        let text = config.to_string();
        assert!(text.contains("N=25, k=2"));
        assert!(text.contains("threads=4, unit_size=auto"));
        assert!(text.contains("timeout=scaled"));
    }

    #[test]
    fn test_metrics_extension() {
        assert_eq!(MetricsFormat::Text.extension(), "txt");
        assert_eq!(MetricsFormat::Json.extension(), "json");
    }
}
