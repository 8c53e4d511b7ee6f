//! Search-space partitioning
//!
//! Splits the candidate range `[1, N]` into contiguous, disjoint work units.
//! Every unit except the last has exactly `unit_size` candidates; the last one
//! absorbs the remainder.
//!
//! # Example
//!
//! ```
//! use sqsearch::partition::{partition, WorkUnit};
//!
//! let units = partition(10, 4)?;
//! assert_eq!(units, vec![
//!     WorkUnit::new(1, 4),
//!     WorkUnit::new(5, 8),
//!     WorkUnit::new(9, 10),
//! ]);
//! # Ok::<(), sqsearch::error::SearchError>(())
//! ```

use crate::error::SearchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Units queued per worker thread when no unit size is configured
const UNITS_PER_THREAD: u64 = 4;

/// Inclusive sub-range `[start, end]` of the search space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkUnit {
    pub start: u64,
    pub end: u64,
}

impl WorkUnit {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "empty work unit [{}, {}]", start, end);
        Self { start, end }
    }

    /// Number of candidates in the unit
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn contains(&self, s: u64) -> bool {
        self.start <= s && s <= self.end
    }

    /// Iterate the candidates of the unit in ascending order
    pub fn candidates(&self) -> std::ops::RangeInclusive<u64> {
        self.start..=self.end
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Split `[1, n]` into `ceil(n / unit_size)` ordered, disjoint units
///
/// Returns `InvalidArgument` when `n` or `unit_size` is zero.
pub fn partition(n: u64, unit_size: u64) -> Result<Vec<WorkUnit>, SearchError> {
    if n == 0 {
        return Err(SearchError::invalid("N must be at least 1"));
    }
    if unit_size == 0 {
        return Err(SearchError::invalid("unit size must be at least 1"));
    }

    let count = n.div_ceil(unit_size);
    let mut units = Vec::with_capacity(count as usize);

    let mut start = 1u64;
    while start <= n {
        // saturating: start + unit_size may exceed u64::MAX when n is near the top
        let end = start.saturating_add(unit_size - 1).min(n);
        units.push(WorkUnit::new(start, end));
        if end == n {
            break;
        }
        start = end + 1;
    }

    Ok(units)
}

/// Check that `units` are ordered, disjoint and cover exactly `[1, n]`
pub fn verify_partition(units: &[WorkUnit], n: u64) -> Result<(), SearchError> {
    let first = units
        .first()
        .ok_or_else(|| SearchError::PartitionViolation("no work units".to_string()))?;
    if first.start != 1 {
        return Err(SearchError::PartitionViolation(format!(
            "first unit {} does not start at 1",
            first
        )));
    }

    for pair in units.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next.start <= prev.end {
            return Err(SearchError::PartitionViolation(format!(
                "units {} and {} overlap",
                prev, next
            )));
        }
        if next.start != prev.end + 1 {
            return Err(SearchError::PartitionViolation(format!(
                "gap between units {} and {}",
                prev, next
            )));
        }
    }

    for unit in units {
        if unit.start > unit.end {
            return Err(SearchError::PartitionViolation(format!(
                "unit {} is inverted",
                unit
            )));
        }
    }

    // first/last exist since units is non-empty
    let last = units[units.len() - 1];
    if last.end != n {
        return Err(SearchError::PartitionViolation(format!(
            "last unit {} does not end at {}",
            last, n
        )));
    }

    Ok(())
}

/// Unit size used when none is configured
///
/// Aims for a few units per worker thread so that the pool stays busy while
/// faster units finish early.
pub fn default_unit_size(n: u64, threads: usize) -> u64 {
    let target_units = (threads.max(1) as u64).saturating_mul(UNITS_PER_THREAD);
    n.div_ceil(target_units).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn assert_exact_cover(n: u64, unit_size: u64) {
        let units = partition(n, unit_size).unwrap();
        verify_partition(&units, n).unwrap();

        assert_eq!(units.len() as u64, n.div_ceil(unit_size));
        let total: u64 = units.iter().map(WorkUnit::size).sum();
        assert_eq!(total, n);

        for unit in &units[..units.len() - 1] {
            assert_eq!(unit.size(), unit_size);
        }
        assert!(units[units.len() - 1].size() <= unit_size);
    }

    #[test]
    fn test_partition_exact_multiple() {
        let units = partition(12, 4).unwrap();
        assert_eq!(
            units,
            vec![
                WorkUnit::new(1, 4),
                WorkUnit::new(5, 8),
                WorkUnit::new(9, 12)
            ]
        );
    }

    #[test]
    fn test_partition_remainder_goes_to_last() {
        let units = partition(10, 3).unwrap();
        assert_eq!(units.len(), 4);
        assert_eq!(units[3], WorkUnit::new(10, 10));
    }

    #[test]
    fn test_partition_single_unit_when_n_small() {
        assert_eq!(partition(5, 100).unwrap(), vec![WorkUnit::new(1, 5)]);
        assert_eq!(partition(1, 1).unwrap(), vec![WorkUnit::new(1, 1)]);
    }

    #[test]
    fn test_partition_unit_size_one() {
        let units = partition(7, 1).unwrap();
        assert_eq!(units.len(), 7);
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(*unit, WorkUnit::new(i as u64 + 1, i as u64 + 1));
        }
    }

    #[test]
    fn test_partition_rejects_zero() {
        assert!(matches!(
            partition(0, 4),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(matches!(
            partition(4, 0),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_partition_near_u64_max() {
        let n = u64::MAX;
        let unit_size = u64::MAX / 2;
        let units = partition(n, unit_size).unwrap();
        verify_partition(&units, n).unwrap();
        assert_eq!(units.len(), 3);
    }

    #[test]
    fn test_partition_coverage_exhaustive_small() {
        for n in 1..=64 {
            for unit_size in 1..=70 {
                assert_exact_cover(n, unit_size);
            }
        }
    }

    #[test]
    fn test_partition_coverage_randomized() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let n = rng.gen_range(1..=100_000u64);
            let unit_size = rng.gen_range(1..=n + 10);
            assert_exact_cover(n, unit_size);
        }
    }

    #[test]
    fn test_partition_deterministic() {
        assert_eq!(partition(1000, 37).unwrap(), partition(1000, 37).unwrap());
    }

    #[test]
    fn test_verify_detects_overlap() {
        let units = vec![WorkUnit::new(1, 5), WorkUnit::new(5, 10)];
        let err = verify_partition(&units, 10).unwrap_err();
        assert!(matches!(err, SearchError::PartitionViolation(ref m) if m.contains("overlap")));
    }

    #[test]
    fn test_verify_detects_gap() {
        let units = vec![WorkUnit::new(1, 4), WorkUnit::new(6, 10)];
        let err = verify_partition(&units, 10).unwrap_err();
        assert!(matches!(err, SearchError::PartitionViolation(ref m) if m.contains("gap")));
    }

    #[test]
    fn test_verify_detects_short_cover() {
        let units = vec![WorkUnit::new(1, 4), WorkUnit::new(5, 9)];
        assert!(verify_partition(&units, 10).is_err());
        assert!(verify_partition(&[], 10).is_err());
        assert!(verify_partition(&[WorkUnit { start: 2, end: 10 }], 10).is_err());
    }

    #[test]
    fn test_default_unit_size() {
        assert_eq!(default_unit_size(1000, 4), 63);
        assert_eq!(default_unit_size(3, 8), 1);
        assert_eq!(default_unit_size(100, 0), 25);
        let units = partition(1000, default_unit_size(1000, 4)).unwrap();
        assert!(units.len() <= 16);
    }
}
