//! The blocking primitive as seen by everything layered on the scheduler
//!
//! Mutexes, semaphores, containers and the item scanner only need something
//! that can park the calling task until a predicate holds. [`Wait`] is that
//! seam; the kernel implements it.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Cooperative blocking
pub trait Wait {
    /// Park the calling task until `ready` returns true.
    ///
    /// Always performs one scheduling pass, even if `ready` already holds.
    /// `ready` may be called many times, from other tasks' scans: it must be
    /// cheap and free of side effects that matter when repeated.
    fn wait_until(&self, ready: &dyn Fn() -> bool);

    /// Give every other ready task one chance to run
    fn yield_now(&self) {
        self.wait_until(&|| true);
    }

    /// Wait until `flag` is set
    fn wait_true(&self, flag: &AtomicBool) {
        self.wait_until(&|| flag.load(Ordering::Relaxed));
    }

    /// Wait until `flag` is cleared
    fn wait_false(&self, flag: &AtomicBool) {
        self.wait_until(&|| !flag.load(Ordering::Relaxed));
    }

    /// Wait until `count` drops to zero
    fn wait_zero(&self, count: &AtomicUsize) {
        self.wait_until(&|| count.load(Ordering::Relaxed) == 0);
    }

    /// Wait until `count` is non-zero
    fn wait_nonzero(&self, count: &AtomicUsize) {
        self.wait_until(&|| count.load(Ordering::Relaxed) != 0);
    }
}

/// Waiter that never switches: fails the test if it would have to block.
#[cfg(test)]
pub(crate) struct Immediate;

#[cfg(test)]
impl Wait for Immediate {
    fn wait_until(&self, ready: &dyn Fn() -> bool) {
        assert!(ready(), "operation would block");
    }
}
