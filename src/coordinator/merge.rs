//! Result merge

/// Sort accumulated solutions ascending
///
/// Units are disjoint, so the accumulated values are already unique and no
/// deduplication happens here. Idempotent: `merge(merge(x)) == merge(x)`.
///
/// # Examples
///
/// ```
/// use sqsearch::coordinator::merge::merge;
///
/// assert_eq!(merge(vec![20, 3, 119]), vec![3, 20, 119]);
/// ```
pub fn merge(mut accumulated: Vec<u64>) -> Vec<u64> {
    accumulated.sort_unstable();
    debug_assert!(
        is_strictly_ascending(&accumulated),
        "duplicate solutions: work units overlap"
    );
    accumulated
}

/// Whether `values` is sorted with no repeats
pub fn is_strictly_ascending(values: &[u64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sorts() {
        assert_eq!(merge(vec![5, 1, 4, 2]), vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge(Vec::new()).is_empty());
    }

    #[test]
    fn test_merge_idempotent() {
        let inputs = vec![
            vec![],
            vec![42],
            vec![9, 8, 7, 6, 5],
            vec![1_000_000, 3, 20, 119, 696],
        ];
        for input in inputs {
            let once = merge(input);
            let twice = merge(once.clone());
            assert_eq!(once, twice);
            assert!(is_strictly_ascending(&once));
        }
    }

    #[test]
    fn test_strictly_ascending() {
        assert!(is_strictly_ascending(&[]));
        assert!(is_strictly_ascending(&[1, 2, 3]));
        assert!(!is_strictly_ascending(&[1, 1, 2]));
        assert!(!is_strictly_ascending(&[2, 1]));
    }
}
