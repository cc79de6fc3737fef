//! Named debounce timers over a wrapping tick counter.
//!
//! A timer is created (armed) the first time it is checked. Once at least
//! `timeout` ticks have passed since it was armed, the check returns true
//! exactly once and re-arms the timer from the current tick, so a timer
//! behaves as a periodic "has N ticks passed since last true" gate.

use crate::key::NameMap;

/// Device time, a monotonically increasing counter that wraps at `u32::MAX`.
pub type Ticks = u32;

/// Injected time source.
pub type ClockFn = Box<dyn Fn() -> Ticks>;

/// Per-timer bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSlot {
    pub start: Ticks,
    pub armed: bool,
}

/// Registry of named timers.
#[derive(Default)]
pub struct Timers {
    clock: Option<ClockFn>,
    slots: NameMap<TimerSlot>,
}

impl Timers {
    /// Creates a registry without a time source. Every timer check passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry reading time from `clock`.
    pub fn with_clock(clock: impl Fn() -> Ticks + 'static) -> Self {
        Self {
            clock: Some(Box::new(clock)),
            slots: NameMap::new(),
        }
    }

    /// Installs or replaces the time source.
    pub fn set_clock(&mut self, clock: impl Fn() -> Ticks + 'static) {
        self.clock = Some(Box::new(clock));
    }

    pub fn has_clock(&self) -> bool {
        self.clock.is_some()
    }

    /// Current tick, or 0 without a time source.
    pub fn now(&self) -> Ticks {
        self.clock.as_ref().map(|clock| clock()).unwrap_or(0)
    }

    /// Ticks from `start` to `end`, accounting for one wraparound.
    pub fn elapsed(start: Ticks, end: Ticks) -> Ticks {
        end.wrapping_sub(start)
    }

    /// Symmetric distance between two timestamps whose order is unknown.
    pub fn diff(a: Ticks, b: Ticks) -> Ticks {
        Self::elapsed(a, b).min(Self::elapsed(b, a))
    }

    /// One-shot debounce check.
    ///
    /// Arms an unknown or disarmed timer and returns false. Otherwise returns
    /// true and re-arms from now when `timeout` ticks have elapsed. Always
    /// true without a time source.
    pub fn validate_timer(&mut self, name: &str, timeout: Ticks) -> bool {
        let Some(clock) = self.clock.as_ref() else {
            return true;
        };
        let now = clock();

        let slot = self.slots.get_or_insert_with(name, || TimerSlot {
            start: now,
            armed: false,
        });

        if !slot.armed {
            *slot = TimerSlot {
                start: now,
                armed: true,
            };
            tracing::trace!(timer = name, now, "timer armed");
            return false;
        }

        if Self::elapsed(slot.start, now) >= timeout {
            slot.start = now;
            tracing::trace!(timer = name, now, timeout, "timer elapsed");
            true
        } else {
            false
        }
    }

    /// Disarms a timer; its next check re-arms it and returns false.
    pub fn reset(&mut self, name: &str) {
        if let Some(slot) = self.slots.get_mut(name) {
            slot.armed = false;
        }
    }

    pub fn is_armed(&self, name: &str) -> bool {
        self.slots.get(name).map(|s| s.armed).unwrap_or(false)
    }

    pub fn slot(&self, name: &str) -> Option<TimerSlot> {
        self.slots.get(name).copied()
    }

    /// Forgets every timer.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
