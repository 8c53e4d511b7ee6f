//! Formatting for durations, rates and counts in run summaries

use std::time::Duration;

/// Human-readable duration, from nanoseconds up to hours
///
/// Sub-minute values keep two decimals; longer ones (typically scaled
/// deadlines) are shown as `XmYYs` or `XhYYm`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    let secs = duration.as_secs();

    match nanos {
        0..=999 => format!("{}ns", nanos),
        1_000..=999_999 => format!("{:.2}us", nanos as f64 / 1e3),
        1_000_000..=999_999_999 => format!("{:.2}ms", nanos as f64 / 1e6),
        _ if secs < 60 => format!("{:.2}s", duration.as_secs_f64()),
        _ if secs < 3600 => format!("{}m{:02}s", secs / 60, secs % 60),
        _ => format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60),
    }
}

/// Throughput with an SI suffix (K, M, G, T)
pub fn format_rate(rate: f64) -> String {
    const SUFFIXES: [&str; 4] = ["K", "M", "G", "T"];

    if rate < 1_000.0 {
        return format!("{:.0}", rate);
    }
    let mut scaled = rate;
    let mut suffix = SUFFIXES[0];
    for s in SUFFIXES {
        scaled /= 1_000.0;
        suffix = s;
        if scaled < 1_000.0 {
            break;
        }
    }
    format!("{:.2}{}", scaled, suffix)
}

/// Items per second over `duration`; 0.0 for a zero duration
pub fn calculate_rate(items: u64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        items as f64 / seconds
    } else {
        0.0
    }
}

/// Format an integer with thousands separators
///
/// ```
/// use sqsearch::util::time::format_number;
///
/// assert_eq!(format_number(1234567), "1,234,567");
/// ```
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
