//! Metrics report file
//!
//! Written after a run as `metrics_N{N}_k{k}.txt` (or `.json`). Every figure is
//! derived from measured values: the coordinator's monotonic timestamps, the
//! candidate counter and, on Linux, process CPU time.

use crate::config::MetricsFormat;
use crate::coordinator::RunOutcome;
use crate::util::resource::ResourceUsage;
use crate::util::time::{calculate_rate, format_number};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Report contents, independent of the output format
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    /// RFC 3339 wall-clock start of the run
    pub started_at: String,
    pub host: String,
    pub n: u64,
    pub k: u64,
    pub status: String,
    pub partial: bool,
    pub unit_size: u64,
    pub units_expected: usize,
    pub units_completed: usize,
    pub worker_threads: usize,
    pub elapsed_secs: f64,
    pub candidates_evaluated: u64,
    /// Candidates per second of wall time
    pub throughput: f64,
    /// Process CPU time, when available
    pub cpu_time_secs: Option<f64>,
    /// CPU time divided by wall time, when available
    pub cpu_ratio: Option<f64>,
    pub solutions: Vec<u64>,
    pub faults: Vec<String>,
}

impl MetricsReport {
    pub fn new(outcome: &RunOutcome, usage: Option<&ResourceUsage>) -> Self {
        let elapsed = outcome.timing.elapsed();
        let stats = &outcome.stats;

        Self {
            started_at: outcome.timing.started_at.to_rfc3339(),
            host: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            n: stats.n,
            k: stats.k,
            status: outcome.status.to_string(),
            partial: outcome.is_partial(),
            unit_size: stats.unit_size,
            units_expected: stats.units_expected,
            units_completed: stats.units_completed,
            worker_threads: stats.worker_threads,
            elapsed_secs: elapsed.as_secs_f64(),
            candidates_evaluated: stats.candidates_evaluated,
            throughput: calculate_rate(stats.candidates_evaluated, elapsed),
            cpu_time_secs: usage.map(|u| u.cpu_time.as_secs_f64()),
            cpu_ratio: usage.map(|u| u.cpu_ratio),
            solutions: outcome.solutions.clone(),
            faults: outcome.faults.iter().map(ToString::to_string).collect(),
        }
    }

    /// Render as plain text
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "Search Metrics")?;
        writeln!(out, "==============")?;
        writeln!(out, "Started:              {}", self.started_at)?;
        writeln!(out, "Host:                 {}", self.host)?;
        writeln!(out)?;
        writeln!(out, "Problem size (N):     {}", self.n)?;
        writeln!(out, "Run length (k):       {}", self.k)?;
        writeln!(out, "Status:               {}", self.status)?;
        writeln!(out, "Partial:              {}", if self.partial { "yes" } else { "no" })?;
        writeln!(out)?;
        writeln!(out, "Worker threads:       {}", self.worker_threads)?;
        writeln!(out, "Unit size:            {}", self.unit_size)?;
        writeln!(
            out,
            "Units completed:      {} / {}",
            self.units_completed, self.units_expected
        )?;
        writeln!(
            out,
            "Candidates evaluated: {}",
            format_number(self.candidates_evaluated)
        )?;
        writeln!(out, "Elapsed wall time:    {:.6}s", self.elapsed_secs)?;
        writeln!(out, "Throughput:           {:.0} candidates/s", self.throughput)?;
        match (self.cpu_time_secs, self.cpu_ratio) {
            (Some(cpu), Some(ratio)) => {
                writeln!(out, "CPU time:             {:.3}s", cpu)?;
                writeln!(out, "CPU/real time ratio:  {:.2}", ratio)?;
            }
            _ => writeln!(out, "CPU time:             unavailable")?,
        }
        writeln!(out)?;

        if !self.faults.is_empty() {
            writeln!(out, "Faults ({}):", self.faults.len())?;
            for fault in &self.faults {
                writeln!(out, "  {}", fault)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "Solutions ({}):", self.solutions.len())?;
        for s in &self.solutions {
            writeln!(out, "{}", s)?;
        }
        Ok(())
    }
}

/// Report file name for a problem size
///
/// ```
/// use sqsearch::config::MetricsFormat;
/// use sqsearch::output::metrics::metrics_filename;
///
/// assert_eq!(metrics_filename(1000, 24, MetricsFormat::Text), "metrics_N1000_k24.txt");
/// ```
pub fn metrics_filename(n: u64, k: u64, format: MetricsFormat) -> String {
    format!("metrics_N{}_k{}.{}", n, k, format.extension())
}

/// Write the metrics report for `outcome` into `dir`, returning its path
pub fn write_metrics(
    outcome: &RunOutcome,
    usage: Option<&ResourceUsage>,
    dir: &Path,
    format: MetricsFormat,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create metrics directory: {}", dir.display()))?;

    let report = MetricsReport::new(outcome, usage);
    let path = dir.join(metrics_filename(report.n, report.k, format));

    let contents = match format {
        MetricsFormat::Text => report.to_text(),
        MetricsFormat::Json => {
            serde_json::to_string_pretty(&report).context("Failed to serialize metrics report")?
        }
    };

    fs::write(&path, contents)
        .with_context(|| format!("Failed to write metrics report: {}", path.display()))?;

    info!(path = %path.display(), "metrics report written");
    Ok(path)
}
