//! Wall-clock time source and interruptible sleep.

use smctl_core::Ticks;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest uninterrupted slice of a sleep before the stop flag is checked.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Milliseconds since construction, truncated to [`Ticks`] so the counter
/// wraps like a device timer.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> Ticks {
        self.start.elapsed().as_millis() as Ticks
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking sleep that returns early once `stop` is raised.
///
/// A zero duration yields the thread instead.
#[derive(Debug, Clone)]
pub struct Sleeper {
    stop: Arc<AtomicBool>,
}

impl Sleeper {
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        Self { stop }
    }

    pub fn sleep(&self, ticks: Ticks) {
        if ticks == 0 {
            std::thread::yield_now();
            return;
        }

        let deadline = Instant::now() + Duration::from_millis(u64::from(ticks));
        while !self.stop.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
