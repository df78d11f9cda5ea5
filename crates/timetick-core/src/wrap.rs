//! Wraparound of unit values into `[min, max)`.
//!
//! The result matches repeatedly adding or subtracting `range = max - min`
//! until the value lands in range, but is computed with Euclidean division so
//! a single call is O(1) for any input. Intermediate math runs in `i128` so
//! `value - min` cannot overflow.

/// Wrap `value` into `[min, max)`. Identity when `max <= 0` (unbounded) or
/// when the range is empty.
pub fn wrap(value: i64, min: i64, max: i64) -> i64 {
    wrap_counted(value, min, max).0
}

/// Wrap `value` into `[min, max)` and report how many whole ranges were
/// added or subtracted to get there.
pub fn wrap_counted(value: i64, min: i64, max: i64) -> (i64, u64) {
    if max <= 0 {
        return (value, 0);
    }
    let range = i128::from(max).saturating_sub(i128::from(min));
    if range <= 0 {
        return (value, 0);
    }

    let offset = i128::from(value).saturating_sub(i128::from(min));
    let (Some(cycles), Some(remainder)) = (
        offset.checked_div_euclid(range),
        offset.checked_rem_euclid(range),
    ) else {
        return (value, 0);
    };

    let wrapped = i128::from(min).saturating_add(remainder);
    let wrapped = i64::try_from(wrapped).unwrap_or(value);
    let count = u64::try_from(cycles.unsigned_abs()).unwrap_or(u64::MAX);
    (wrapped, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unbounded_is_identity() {
        assert_eq!(wrap(1_000, 0, crate::unit::UNBOUNDED), 1_000);
        assert_eq!(wrap(-5, 0, 0), -5);
    }

    #[test]
    fn wraps_at_exclusive_max() {
        assert_eq!(wrap(24, 0, 24), 0);
        assert_eq!(wrap(23, 0, 24), 23);
        assert_eq!(wrap(13, 1, 13), 1);
    }

    #[test]
    fn wraps_below_min() {
        assert_eq!(wrap(-1, 0, 60), 59);
        assert_eq!(wrap(0, 1, 13), 12);
    }

    #[test]
    fn negative_min_range() {
        // [-5, 5): range 10
        assert_eq!(wrap(5, -5, 5), -5);
        assert_eq!(wrap(-6, -5, 5), 4);
        assert_eq!(wrap(17, -5, 5), -3);
    }

    #[test]
    fn counts_whole_ranges() {
        assert_eq!(wrap_counted(25, 0, 10), (5, 2));
        assert_eq!(wrap_counted(9, 0, 10), (9, 0));
        assert_eq!(wrap_counted(-11, 0, 10), (9, 2));
    }

    #[test]
    fn extreme_values_stay_in_range() {
        let (v, _) = wrap_counted(i64::MAX, i64::MIN, 1);
        assert!((i64::MIN..1).contains(&v));
        let (v, _) = wrap_counted(i64::MIN, 0, i64::MAX);
        assert!((0..i64::MAX).contains(&v));
    }

    /// Reference implementation: the iterative +/- range loop.
    fn wrap_iterative(mut value: i64, min: i64, max: i64) -> i64 {
        if max <= 0 {
            return value;
        }
        let range = max - min;
        while value >= max {
            value -= range;
        }
        while value < min {
            value += range;
        }
        value
    }

    proptest! {
        #[test]
        fn wrap_is_idempotent_and_in_range(v in -100_000i64..100_000, min in -500i64..500, span in 1i64..500) {
            let max = min + span;
            prop_assume!(max > 0);
            let once = wrap(v, min, max);
            prop_assert!(once >= min && once < max);
            prop_assert_eq!(wrap(once, min, max), once);
        }

        #[test]
        fn wrap_matches_iterative_loop(v in -10_000i64..10_000, min in -100i64..100, span in 1i64..200) {
            let max = min + span;
            prop_assume!(max > 0);
            prop_assert_eq!(wrap(v, min, max), wrap_iterative(v, min, max));
        }
    }
}
