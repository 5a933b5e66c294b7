//! Worker pool sizing helpers

use std::num::NonZeroUsize;
use std::thread;

/// Number of hardware threads, or 1 when it cannot be determined
pub fn available_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Hardware parallelism clamped into `[min, max]`
pub fn clamped_workers(min: usize, max: usize) -> usize {
    available_workers().clamp(min, max.max(min))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_workers_is_positive() {
        assert!(available_workers() >= 1);
    }

    #[test]
    fn test_clamped_workers_stays_in_range() {
        let workers = clamped_workers(4, 16);
        assert!((4..=16).contains(&workers));
    }

    #[test]
    fn test_inverted_bounds_use_min() {
        assert_eq!(clamped_workers(8, 2), 8);
    }
}
