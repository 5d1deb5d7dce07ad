//! # Time Utilities

use std::time::{Duration, Instant};

/// Time an operation; return (duration, result).
pub fn timeit<F, R>(f: F) -> (Duration, R)
where
    F: FnOnce() -> R,
{
    let t0 = Instant::now();
    let ret = f();
    (t0.elapsed(), ret)
}

/// Bytes per second, or 0 for an instant run.
pub fn throughput(
    bytes: u64,
    elapsed: Duration,
) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { bytes as f64 / secs } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeit() {
        let (elapsed, value) = timeit(|| {
            std::thread::sleep(Duration::from_millis(5));
            7
        });
        assert_eq!(value, 7);
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_throughput() {
        assert_eq!(throughput(100, Duration::from_secs(2)), 50.0);
        assert_eq!(throughput(100, Duration::ZERO), 0.0);
    }
}
