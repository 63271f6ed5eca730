//! Tick pacing and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Paces the scan loop between ticks.
///
/// A UI host would back this with its repaint callback; the CLI uses
/// a fixed-rate ticker.
pub trait TickSource {
    /// Blocks until the next tick is due.
    fn wait_next(&mut self);
}

/// Sleeps to a fixed cadence.
///
/// A tick that arrives late does not trigger a burst of catch-up ticks;
/// the schedule restarts from the late tick instead.
#[derive(Debug)]
pub struct FixedRateTicker {
    interval: Duration,
    next: Option<Instant>,
}

impl FixedRateTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl TickSource for FixedRateTicker {
    fn wait_next(&mut self) {
        let now = Instant::now();
        let deadline = self.next.unwrap_or(now + self.interval);
        if deadline > now {
            std::thread::sleep(deadline - now);
            self.next = Some(deadline + self.interval);
        } else {
            self.next = Some(now + self.interval);
        }
    }
}

/// Shared cancellation flag.
///
/// Cloned handles observe the same flag, so a signal handler or UI
/// thread can cancel a scan driven elsewhere. The scan loop only looks
/// at it between decodes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clears the flag so the token can guard a new attempt.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
