//! # Fibonacci Backoff
//!
//! Per-resource retry delays for failed synchronizations. Grows more slowly
//! than exponential backoff, which suits errors that usually clear on their
//! own (the service CA has not written the secret yet, an update conflict).
//!
//! ```rust
//! use serving_cert_keystore_controller::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(5, 300);
//! assert_eq!(backoff.next_backoff_seconds(), 5);
//! assert_eq!(backoff.next_backoff_seconds(), 5);
//! assert_eq!(backoff.next_backoff_seconds(), 10);
//! assert_eq!(backoff.next_backoff_seconds(), 15);
//! ```

/// Fibonacci backoff calculator, in seconds
///
/// Each delay is the sum of the previous two, starting at `min_secs` twice and
/// capped at `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    prev_secs: u64,
    current_secs: u64,
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min_secs` and never exceeding `max_secs`
    ///
    /// A zero minimum is raised to one second so the sequence always grows.
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let max_secs = max_secs.max(1);
        Self {
            prev_secs: 0,
            current_secs: min_secs.max(1).min(max_secs),
            max_secs,
        }
    }

    /// Return the current delay in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_secs;

        let next = self.prev_secs.saturating_add(self.current_secs);
        self.prev_secs = self.current_secs;
        self.current_secs = next.min(self.max_secs);

        result
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(5, 300);
        let sequence: Vec<u64> = (0..11).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(
            sequence,
            vec![5, 5, 10, 15, 25, 40, 65, 105, 170, 275, 300]
        );
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(1, 3);
        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 2);
        assert_eq!(backoff.next_backoff_seconds(), 3);
        // 5 would be next, capped at 3
        assert_eq!(backoff.next_backoff_seconds(), 3);
        assert_eq!(backoff.next_backoff_seconds(), 3);
    }

    #[test]
    fn test_zero_minimum_still_backs_off() {
        let mut backoff = FibonacciBackoff::new(0, 10);
        assert_eq!(backoff.next_backoff_seconds(), 1);
    }

    #[test]
    fn test_minimum_above_maximum_is_capped() {
        let mut backoff = FibonacciBackoff::new(60, 10);
        assert_eq!(backoff.next_backoff_seconds(), 10);
        assert_eq!(backoff.next_backoff_seconds(), 10);
    }
}
