use std::time::Duration;

/// Exponential backoff: `min * 2^attempt`, capped at `max`.
///
/// No jitter. Overflowing products saturate to `max`.
pub fn compute_backoff(min: Duration, max: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| min.checked_mul(factor))
        .map_or(max, |wait| wait.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(30);

    #[test]
    fn doubles_until_capped() {
        let got: Vec<u64> = (0..8)
            .map(|n| compute_backoff(MIN, MAX, n).as_secs())
            .collect();
        assert_eq!(got, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn non_decreasing_and_bounded() {
        for (min, max) in [(1u64, 1u64), (1, 30), (3, 100), (7, 7_000)] {
            let (min, max) = (Duration::from_secs(min), Duration::from_secs(max));
            let mut prev = Duration::ZERO;
            for n in 0..80 {
                let wait = compute_backoff(min, max, n);
                assert!(wait >= prev, "attempt {} went down", n);
                assert!(wait <= max);
                prev = wait;
            }
        }
    }

    #[test]
    fn huge_attempt_saturates() {
        assert_eq!(compute_backoff(MIN, MAX, u32::MAX), MAX);
    }
}
