//! Sum-of-squares predicate
//!
//! Pure arithmetic evaluated once per candidate by the workers. Sums are
//! computed in `u128` with checked operations so that extreme requests surface
//! as [`SearchError::Overflow`] instead of wrapping silently.

use crate::error::SearchError;

/// Sum of `k` consecutive squares starting at `start`
///
/// Uses the closed form `k·s² + k(k-1)·s + k(k-1)(2k-1)/6`.
///
/// # Examples
///
/// ```
/// use sqsearch::predicate::sum_of_squares;
///
/// // 3² + 4² = 25
/// assert_eq!(sum_of_squares(3, 2).unwrap(), 25);
/// // 1² + ... + 24² = 4900
/// assert_eq!(sum_of_squares(1, 24).unwrap(), 4900);
/// ```
pub fn sum_of_squares(start: u64, k: u64) -> Result<u128, SearchError> {
    let overflow = || SearchError::Overflow { start, k };

    let s = start as u128;
    let k = k as u128;
    if k == 0 {
        return Ok(0);
    }

    // k(k-1)(2k-1) is always divisible by 6
    let km1 = k - 1;
    let tail = k
        .checked_mul(km1)
        .and_then(|v| v.checked_mul(2 * km1 + 1))
        .map(|v| v / 6)
        .ok_or_else(overflow)?;

    let quadratic = s
        .checked_mul(s)
        .and_then(|v| v.checked_mul(k))
        .ok_or_else(overflow)?;

    let linear = k
        .checked_mul(km1)
        .and_then(|v| v.checked_mul(s))
        .ok_or_else(overflow)?;

    quadratic
        .checked_add(linear)
        .and_then(|v| v.checked_add(tail))
        .ok_or_else(overflow)
}

/// Integer square root (floor) of `n`
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }

    // Float estimate, then correct for rounding in either direction
    let mut x = (n as f64).sqrt() as u128;
    while x.checked_mul(x).map_or(true, |sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).map_or(false, |sq| sq <= n) {
        x += 1;
    }
    x
}

/// Whether `n` is the square of some integer
///
/// # Examples
///
/// ```
/// use sqsearch::predicate::is_perfect_square;
///
/// assert!(is_perfect_square(841));
/// assert!(!is_perfect_square(842));
/// ```
pub fn is_perfect_square(n: u128) -> bool {
    let r = isqrt(n);
    r * r == n
}
