//! Process resource accounting
//!
//! Reads CPU time and memory from `/proc/self/stat` and `/proc/self/status` on
//! Linux. Elsewhere snapshots are unavailable and reports omit the CPU figures.

use serde::Serialize;
use std::fs;
use std::time::{Duration, Instant};

/// Clock ticks per second for `/proc/self/stat` (USER_HZ)
const TICKS_PER_SEC: u64 = 100;

/// Resource utilization snapshot
#[derive(Debug, Clone, Copy)]
pub struct ResourceSnapshot {
    /// CPU time in user mode (microseconds)
    pub cpu_user_us: u64,
    /// CPU time in kernel mode (microseconds)
    pub cpu_system_us: u64,
    /// Monotonic time when the snapshot was taken
    pub timestamp: Instant,
    /// Resident Set Size (RSS) in bytes
    pub memory_rss_bytes: u64,
}

/// CPU and memory used between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceUsage {
    /// User + system CPU time
    pub cpu_time: Duration,
    /// Wall-clock time between the snapshots
    pub wall_time: Duration,
    /// `cpu_time / wall_time`; above 1.0 means several cores were busy
    pub cpu_ratio: f64,
    /// RSS at the later snapshot
    pub memory_rss_bytes: u64,
}

impl ResourceSnapshot {
    /// Take a snapshot of current resource utilization
    ///
    /// Returns None if the proc files cannot be read (e.g. on non-Linux systems).
    pub fn take() -> Option<Self> {
        let (cpu_user_us, cpu_system_us) = Self::read_cpu_time()?;
        let memory_rss_bytes = Self::read_rss().unwrap_or(0);

        Some(Self {
            cpu_user_us,
            cpu_system_us,
            timestamp: Instant::now(),
            memory_rss_bytes,
        })
    }

    /// Read CPU time from /proc/self/stat
    ///
    /// Returns (user_time_us, system_time_us) or None on error.
    fn read_cpu_time() -> Option<(u64, u64)> {
        let stat = fs::read_to_string("/proc/self/stat").ok()?;
        parse_stat_cpu_time(&stat)
    }

    /// Read VmRSS from /proc/self/status
    fn read_rss() -> Option<u64> {
        let status = fs::read_to_string("/proc/self/status").ok()?;
        parse_status_rss(&status)
    }

    /// Total CPU time consumed since `earlier`
    pub fn cpu_time_since(&self, earlier: &ResourceSnapshot) -> Duration {
        let now = self.cpu_user_us + self.cpu_system_us;
        let then = earlier.cpu_user_us + earlier.cpu_system_us;
        Duration::from_micros(now.saturating_sub(then))
    }

    /// CPU and wall time between `earlier` and this snapshot
    pub fn usage_since(&self, earlier: &ResourceSnapshot) -> ResourceUsage {
        let cpu_time = self.cpu_time_since(earlier);
        let wall_time = self.timestamp.saturating_duration_since(earlier.timestamp);
        ResourceUsage {
            cpu_time,
            wall_time,
            cpu_ratio: cpu_ratio(cpu_time, wall_time),
            memory_rss_bytes: self.memory_rss_bytes,
        }
    }
}

/// CPU time divided by wall time; 0.0 for an empty interval
pub fn cpu_ratio(cpu_time: Duration, wall_time: Duration) -> f64 {
    let wall = wall_time.as_secs_f64();
    if wall > 0.0 {
        cpu_time.as_secs_f64() / wall
    } else {
        0.0
    }
}

/// Extract (utime, stime) in microseconds from a `/proc/<pid>/stat` line
///
/// The command name may contain spaces, so fields are counted after the
/// closing parenthesis.
fn parse_stat_cpu_time(stat: &str) -> Option<(u64, u64)> {
    let after_comm = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = after_comm.split_whitespace().collect();

    // After "(comm)": state is field 3 of the full line, utime 14, stime 15
    let utime_ticks: u64 = fields.get(11)?.parse().ok()?;
    let stime_ticks: u64 = fields.get(12)?.parse().ok()?;

    Some((
        utime_ticks * 1_000_000 / TICKS_PER_SEC,
        stime_ticks * 1_000_000 / TICKS_PER_SEC,
    ))
}

/// Extract VmRSS in bytes from `/proc/<pid>/status`
fn parse_status_rss(status: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}
