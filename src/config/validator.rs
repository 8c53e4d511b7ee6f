//! Configuration validation
//!
//! All failures are [`SearchError::InvalidArgument`] so that `main` can report
//! them with usage text and a non-zero exit status.

use super::*;
use crate::error::SearchError;
use anyhow::Result;
use tracing::warn;

/// Upper bound on the number of work units a run may create
pub const MAX_UNITS: u64 = 1 << 24;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_search(&config.search)?;
    validate_workers(&config.workers, config.search.n.unwrap_or(1))?;
    validate_runtime(&config.runtime)?;
    Ok(())
}

/// Validate problem definition
pub fn validate_search(search: &SearchConfig) -> Result<()> {
    match search.n {
        None => return Err(SearchError::invalid("missing N (search upper bound)").into()),
        Some(0) => return Err(SearchError::invalid("N must be at least 1").into()),
        Some(_) => {}
    }
    match search.k {
        None => return Err(SearchError::invalid("missing K (run length)").into()),
        Some(0) => return Err(SearchError::invalid("K must be at least 1").into()),
        Some(_) => {}
    }
    Ok(())
}

/// Validate worker pool settings against the search size
pub fn validate_workers(workers: &WorkerConfig, n: u64) -> Result<()> {
    if workers.threads == Some(0) {
        return Err(SearchError::invalid("threads must be at least 1").into());
    }

    if let Some(unit_size) = workers.unit_size {
        if unit_size == 0 {
            return Err(SearchError::invalid("unit_size must be at least 1").into());
        }

        let units = n.div_ceil(unit_size);
        if units > MAX_UNITS {
            return Err(SearchError::invalid(format!(
                "unit_size {} splits N={} into {} units (maximum {})",
                unit_size, n, units, MAX_UNITS
            ))
            .into());
        }
    }

    let threads = workers.effective_threads();
    if threads > 4 * num_cpus::get() {
        warn!(
            threads,
            cpus = num_cpus::get(),
            "thread count far exceeds available CPUs"
        );
    }

    Ok(())
}

/// Validate runtime settings
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    if let Some(timeout) = runtime
        .timeout_duration()
        .map_err(|e| SearchError::invalid(format!("timeout: {:#}", e)))?
    {
        if timeout.is_zero() {
            return Err(SearchError::invalid("timeout must be greater than zero").into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.search.n = Some(100);
        config.search.k = Some(2);
        config
    }

    fn is_invalid_argument(result: Result<()>) -> bool {
        matches!(
            result.unwrap_err().downcast_ref::<SearchError>(),
            Some(SearchError::InvalidArgument(_))
        )
    }

    #[test]
    fn test_valid_config() {
        validate_config(&valid_config()).unwrap();
    }

    #[test]
    fn test_missing_or_zero_n() {
        let mut config = valid_config();
        config.search.n = None;
        assert!(is_invalid_argument(validate_config(&config)));

        config.search.n = Some(0);
        assert!(is_invalid_argument(validate_config(&config)));
    }

    #[test]
    fn test_missing_or_zero_k() {
        let mut config = valid_config();
        config.search.k = None;
        assert!(is_invalid_argument(validate_config(&config)));

        config.search.k = Some(0);
        assert!(is_invalid_argument(validate_config(&config)));
    }

    #[test]
    fn test_workers() {
        let mut config = valid_config();
        config.workers.threads = Some(0);
        assert!(is_invalid_argument(validate_config(&config)));

        config.workers.threads = Some(2);
        config.workers.unit_size = Some(0);
        assert!(is_invalid_argument(validate_config(&config)));

        config.workers.unit_size = Some(1);
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_too_many_units() {
        let mut config = valid_config();
        config.search.n = Some(u64::MAX);
        config.workers.unit_size = Some(1);
        assert!(is_invalid_argument(validate_config(&config)));
    }

    #[test]
    fn test_runtime() {
        let mut config = valid_config();
        config.runtime.timeout = Some("0s".to_string());
        assert!(is_invalid_argument(validate_config(&config)));

        config.runtime.timeout = Some("eventually".to_string());
        assert!(is_invalid_argument(validate_config(&config)));

        config.runtime.timeout = Some("2m".to_string());
        validate_config(&config).unwrap();
    }
}
