//! Fixed-size LIFO stack with built-in waiting
//!
//! Items occupy `[top, N)` and grow downwards. `at(0)` is the top item.

use spin::Mutex as SpinMutex;

use crate::container::FixedContainer;
use crate::wait::Wait;

struct Slots<T, const N: usize> {
    buffer: [T; N],
    top: usize,
}

/// Fixed-size stack
pub struct FixedStack<T, const N: usize> {
    slots: SpinMutex<Slots<T, N>>,
}

impl<T: Copy, const N: usize> FixedStack<T, N> {
    /// Empty stack; `blank` fills the unused storage
    pub const fn new(blank: T) -> Self {
        Self {
            slots: SpinMutex::new(Slots {
                buffer: [blank; N],
                top: N,
            }),
        }
    }

    /// Push onto the top, waiting for a free slot
    pub fn push<W: Wait + ?Sized>(&self, waiter: &W, item: T) {
        self.wait_empty(waiter);
        let mut slots = self.slots.lock();
        slots.top -= 1;
        let top = slots.top;
        slots.buffer[top] = item;
    }

    /// Pop the top item, waiting for one
    pub fn pop<W: Wait + ?Sized>(&self, waiter: &W) -> T {
        self.wait_item(waiter);
        let mut slots = self.slots.lock();
        let item = slots.buffer[slots.top];
        slots.top += 1;
        item
    }
}

impl<T: Copy, const N: usize> FixedContainer for FixedStack<T, N> {
    type Item = T;

    fn capacity(&self) -> usize {
        N
    }

    fn item_count(&self) -> usize {
        N - self.slots.lock().top
    }

    fn empty_count(&self) -> usize {
        self.slots.lock().top
    }

    fn at(&self, index: usize) -> T {
        let slots = self.slots.lock();
        slots.buffer[slots.top + index]
    }

    fn clear(&self) {
        self.slots.lock().top = N;
    }
}
