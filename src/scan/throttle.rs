//! Rate limiting for decode candidates.

use std::time::{Duration, Instant};

/// Drops a candidate that repeats the last admitted text within an interval.
///
/// Once a code resolves, a few frames already in flight may decode the
/// same symbol again; those are dropped here instead of re-validated.
/// A different text is always admitted, so a rejected read never masks
/// the next symbol in view.
#[derive(Debug, Clone)]
pub struct CandidateThrottle {
    interval: Duration,
    last_admitted: Option<(String, Instant)>,
}

impl CandidateThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
        }
    }

    /// Returns true and records `text` at `now` unless the same text was
    /// admitted less than one interval ago.
    pub fn admit(&mut self, text: &str, now: Instant) -> bool {
        if let Some((last_text, last)) = &self.last_admitted {
            if last_text == text && now.saturating_duration_since(*last) < self.interval {
                return false;
            }
        }
        self.last_admitted = Some((text.to_owned(), now));
        true
    }

    pub fn reset(&mut self) {
        self.last_admitted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_window() {
        let mut throttle = CandidateThrottle::new(Duration::from_millis(100));
        let t0 = Instant::now();

        assert!(throttle.admit("590", t0));
        assert!(!throttle.admit("590", t0 + Duration::from_millis(40)));
        assert!(!throttle.admit("590", t0 + Duration::from_millis(99)));
        assert!(throttle.admit("590", t0 + Duration::from_millis(100)));
        assert!(!throttle.admit("590", t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_different_text_is_admitted_inside_window() {
        let mut throttle = CandidateThrottle::new(Duration::from_millis(100));
        let t0 = Instant::now();

        assert!(throttle.admit("QR:hello", t0));
        assert!(throttle.admit("5901234123457", t0 + Duration::from_millis(10)));
        // The window now belongs to the newer text.
        assert!(throttle.admit("QR:hello", t0 + Duration::from_millis(20)));
        assert!(!throttle.admit("QR:hello", t0 + Duration::from_millis(30)));
    }

    #[test]
    fn test_zero_interval_admits_everything() {
        let mut throttle = CandidateThrottle::new(Duration::ZERO);
        let now = Instant::now();
        assert!(throttle.admit("1", now));
        assert!(throttle.admit("1", now));
    }

    #[test]
    fn test_reset() {
        let mut throttle = CandidateThrottle::new(Duration::from_secs(1));
        let now = Instant::now();
        assert!(throttle.admit("1", now));
        throttle.reset();
        assert!(throttle.admit("1", now));
    }
}
