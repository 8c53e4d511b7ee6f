//! Result consumers: console output and the metrics report

pub mod metrics;
pub mod text;
