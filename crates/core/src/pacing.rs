//! Request pacing: batch splitting and randomized jitter.

use std::time::Duration;

use rand::Rng;

/// Inclusive range a per-request jitter delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterRange {
    pub min: Duration,
    pub max: Duration,
}

impl Default for JitterRange {
    fn default() -> Self {
        Self { min: Duration::from_millis(1000), max: Duration::from_millis(2500) }
    }
}

impl JitterRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max { Self { min, max } } else { Self { min: max, max: min } }
    }

    /// A range that always yields `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self { min: delay, max: delay }
    }

    /// No jitter at all.
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    /// Draws one delay with millisecond resolution.
    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if min >= max {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Splits `items` into consecutive batches of at most `size` (minimum one).
pub fn batches<T>(items: &[T], size: usize) -> impl Iterator<Item = &[T]> {
    items.chunks(size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_sample_stays_in_range() {
        let range = JitterRange::default();
        for _ in 0..200 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(1000) && d <= Duration::from_millis(2500), "{d:?}");
        }
    }

    #[test]
    fn test_new_orders_bounds() {
        let range = JitterRange::new(Duration::from_millis(900), Duration::from_millis(100));
        assert_eq!(range.min, Duration::from_millis(100));
        assert_eq!(range.max, Duration::from_millis(900));
    }

    #[test]
    fn test_fixed_and_none() {
        assert_eq!(JitterRange::fixed(Duration::from_millis(5)).sample(), Duration::from_millis(5));
        assert_eq!(JitterRange::none().sample(), Duration::ZERO);
    }

    #[rstest]
    #[case(7, 3, vec![3, 3, 1])]
    #[case(6, 3, vec![3, 3])]
    #[case(2, 5, vec![2])]
    #[case(3, 0, vec![1, 1, 1])]
    fn test_batches(#[case] len: usize, #[case] size: usize, #[case] expected: Vec<usize>) {
        let items: Vec<usize> = (0..len).collect();
        let sizes: Vec<usize> = batches(&items, size).map(<[usize]>::len).collect();
        assert_eq!(sizes, expected);
    }
}
