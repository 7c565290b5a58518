//! System tick counter: hardware-abstract time base
//!
//! One interrupt handler increments the counter once per time unit. All
//! comparisons use signed differences so they survive wraparound, valid for
//! horizons up to 2^31 ticks (about 24 days at 1 kHz).

use core::sync::atomic::{AtomicU32, Ordering};

/// Has `now` reached `future`? Wraparound-safe.
pub const fn tick_reached(now: u32, future: u32) -> bool {
    (now.wrapping_sub(future) as i32) >= 0
}

/// Global tick counter
///
/// Only one writer (the tick interrupt) is assumed, so advancing is a plain
/// load + store and works on cores without atomic read-modify-write.
pub struct TickCounter {
    ticks: AtomicU32,
}

impl TickCounter {
    /// Counter starting at zero
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Counter starting at `start` (useful to exercise wraparound)
    pub const fn starting_at(start: u32) -> Self {
        Self {
            ticks: AtomicU32::new(start),
        }
    }

    /// Advance by one tick. Call from the tick interrupt.
    pub fn advance(&self) {
        let now = self.ticks.load(Ordering::Relaxed);
        self.ticks.store(now.wrapping_add(1), Ordering::Relaxed);
    }

    /// Current tick
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Overwrite the counter (port synchronisation with a hardware timer)
    pub fn set(&self, ticks: u32) {
        self.ticks.store(ticks, Ordering::Relaxed);
    }

    /// Tick value `duration` ticks from now
    pub fn future(&self, duration: u32) -> u32 {
        self.now().wrapping_add(duration)
    }

    /// Has the counter reached `future`?
    pub fn is_out(&self, future: u32) -> bool {
        tick_reached(self.now(), future)
    }

    /// Ticks elapsed since a reference point
    pub fn elapsed_since(&self, reference: u32) -> u32 {
        self.now().wrapping_sub(reference)
    }

    /// Deadline `duration` ticks from now
    pub fn deadline(&self, duration: u32) -> Deadline {
        Deadline::at(self.future(duration))
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute point in tick time
///
/// Combine with a readiness predicate to bound a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: u32,
}

impl Deadline {
    /// Deadline at an absolute tick
    pub const fn at(tick: u32) -> Self {
        Self { at: tick }
    }

    /// Absolute tick of this deadline
    pub const fn tick(&self) -> u32 {
        self.at
    }

    /// Has the counter reached the deadline?
    pub fn is_out(&self, counter: &TickCounter) -> bool {
        counter.is_out(self.at)
    }

    /// Ticks left until the deadline (0 once reached)
    pub fn remaining(&self, counter: &TickCounter) -> u32 {
        if self.is_out(counter) {
            0
        } else {
            self.at.wrapping_sub(counter.now())
        }
    }
}
