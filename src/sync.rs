//! Mutex and counting semaphore over the blocking primitive
//!
//! Both are advisory: nothing records an owner, and a task holding one
//! across a long computation without blocking starves everyone else. Only
//! one task runs at a time, so check-then-set needs no atomic RMW.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::wait::Wait;

/// Binary lock
pub struct Mutex {
    held: AtomicBool,
}

impl Mutex {
    /// Unlocked mutex
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Is some task holding the lock?
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }

    /// Take the lock, blocking while another task holds it
    pub fn lock<W: Wait + ?Sized>(&self, waiter: &W) {
        if self.is_locked() {
            waiter.wait_false(&self.held);
        }
        self.held.store(true, Ordering::Relaxed);
    }

    /// Release the lock. Any task may unlock.
    pub fn unlock(&self) {
        self.held.store(false, Ordering::Relaxed);
    }

    /// Lock for the lifetime of the returned guard
    pub fn guard<W: Wait + ?Sized>(&self, waiter: &W) -> MutexGuard<'_> {
        MutexGuard::new(self, waiter)
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a [`Mutex`] until dropped
#[must_use = "the mutex is released as soon as the guard is dropped"]
pub struct MutexGuard<'a> {
    mutex: &'a Mutex,
}

impl<'a> MutexGuard<'a> {
    /// Lock `mutex`, blocking through `waiter` while it is held
    pub fn new<W: Wait + ?Sized>(mutex: &'a Mutex, waiter: &W) -> Self {
        mutex.lock(waiter);
        Self { mutex }
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

/// Counting semaphore; held while the counter is zero
pub struct Semaphore {
    available: AtomicUsize,
}

impl Semaphore {
    /// Semaphore admitting `capacity` concurrent holders
    pub const fn new(capacity: usize) -> Self {
        Self {
            available: AtomicUsize::new(capacity),
        }
    }

    /// Are all permits taken?
    pub fn is_locked(&self) -> bool {
        self.available() == 0
    }

    /// Remaining permits
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Relaxed)
    }

    /// Take a permit, blocking while none is left
    pub fn lock<W: Wait + ?Sized>(&self, waiter: &W) {
        if self.is_locked() {
            waiter.wait_nonzero(&self.available);
        }
        self.available.store(self.available() - 1, Ordering::Relaxed);
    }

    /// Return a permit. Unmatched calls grow the count past the capacity.
    pub fn unlock(&self) {
        self.available.store(self.available() + 1, Ordering::Relaxed);
    }

    /// Take a permit for the lifetime of the returned guard
    pub fn guard<W: Wait + ?Sized>(&self, waiter: &W) -> SemaphoreGuard<'_> {
        SemaphoreGuard::new(self, waiter)
    }
}

/// Holds a [`Semaphore`] permit until dropped
#[must_use = "the permit is returned as soon as the guard is dropped"]
pub struct SemaphoreGuard<'a> {
    semaphore: &'a Semaphore,
}

impl<'a> SemaphoreGuard<'a> {
    /// Take a permit from `semaphore`, blocking through `waiter` while none is left
    pub fn new<W: Wait + ?Sized>(semaphore: &'a Semaphore, waiter: &W) -> Self {
        semaphore.lock(waiter);
        Self { semaphore }
    }
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        self.semaphore.unlock();
    }
}
