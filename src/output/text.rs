//! Human-readable text output
//!
//! Solutions go to stdout, one per line, so the output can be piped. The
//! run summary goes to stderr.

use crate::config::OutputConfig;
use crate::coordinator::{RunOutcome, RunStatus};
use crate::util::resource::ResourceUsage;
use crate::util::time::{calculate_rate, format_duration, format_number, format_rate};
use anyhow::{Context, Result};
use std::io::{self, Write};

/// Prefix of the line that marks an incomplete solution list
pub const PARTIAL_MARKER: &str = "# PARTIAL RESULT";

/// Print solutions to stdout and, unless quiet, the summary to stderr
pub fn print_results(
    outcome: &RunOutcome,
    usage: Option<&ResourceUsage>,
    output: &OutputConfig,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_solutions(&mut out, outcome).context("Failed to write solutions")?;
    out.flush().context("Failed to flush stdout")?;

    if !output.quiet {
        let stderr = io::stderr();
        let mut err = stderr.lock();
        write_summary(&mut err, outcome, usage).context("Failed to write summary")?;
    }
    Ok(())
}

/// Write the ascending solution list, preceded by a marker line when partial
pub fn write_solutions<W: Write>(out: &mut W, outcome: &RunOutcome) -> io::Result<()> {
    if outcome.status == RunStatus::TimedOut {
        writeln!(
            out,
            "{}: timed out after {} with {}/{} units complete",
            PARTIAL_MARKER,
            format_duration(outcome.timing.elapsed()),
            outcome.stats.units_completed,
            outcome.stats.units_expected
        )?;
    } else if !outcome.faults.is_empty() {
        writeln!(
            out,
            "{}: {} unit(s) faulted",
            PARTIAL_MARKER,
            outcome.faults.len()
        )?;
    }

    for s in &outcome.solutions {
        writeln!(out, "{}", s)?;
    }
    Ok(())
}

/// Write the run summary block
pub fn write_summary<W: Write>(
    out: &mut W,
    outcome: &RunOutcome,
    usage: Option<&ResourceUsage>,
) -> io::Result<()> {
    let stats = &outcome.stats;
    let elapsed = outcome.timing.elapsed();

    writeln!(out, "═══════════════════════════════════════════════════════════")?;
    writeln!(out, "                    SEARCH RESULTS")?;
    writeln!(out, "═══════════════════════════════════════════════════════════")?;
    writeln!(out)?;
    writeln!(out, "Problem:  N = {}, k = {}", format_number(stats.n), stats.k)?;
    writeln!(out, "Status:   {}", outcome.status)?;
    writeln!(out, "Elapsed:  {:.3}s", elapsed.as_secs_f64())?;
    writeln!(out)?;

    writeln!(out, "Work:")?;
    writeln!(
        out,
        "  Units:      {} / {} complete ({} candidates each)",
        format_number(stats.units_completed as u64),
        format_number(stats.units_expected as u64),
        format_number(stats.unit_size)
    )?;
    writeln!(out, "  Workers:    {}", stats.worker_threads)?;
    writeln!(
        out,
        "  Evaluated:  {} candidates ({}/s)",
        format_number(stats.candidates_evaluated),
        format_rate(calculate_rate(stats.candidates_evaluated, elapsed))
    )?;
    if outcome.status == RunStatus::TimedOut {
        writeln!(out, "  Deadline:   {}", format_duration(stats.deadline))?;
    }
    writeln!(out)?;

    if !outcome.faults.is_empty() {
        writeln!(out, "Faults:")?;
        for fault in &outcome.faults {
            writeln!(out, "  {}", fault)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "Solutions: {}", outcome.solutions.len())?;
    writeln!(out)?;

    if let Some(usage) = usage {
        writeln!(out, "Resource Utilization:")?;
        writeln!(
            out,
            "  CPU:    {:.3}s ({:.2}x wall time)",
            usage.cpu_time.as_secs_f64(),
            usage.cpu_ratio
        )?;
        writeln!(out, "  Memory: {}", format_bytes(usage.memory_rss_bytes))?;
        writeln!(out)?;
    }

    writeln!(out, "═══════════════════════════════════════════════════════════")?;
    Ok(())
}

/// Format bytes with appropriate units
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
