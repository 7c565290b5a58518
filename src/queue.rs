//! Fixed-size FIFO ring buffer with built-in waiting
//!
//! Capacity `N` storage holds `N - 1` items: one slot always stays vacant so
//! `head == tail` means empty. `enqueue` waits for space, `dequeue` for an
//! item. The continuous span (head up to the tail or the end of storage,
//! whichever comes first) supports block transfers such as DMA without
//! wraparound handling in the caller.

use spin::Mutex as SpinMutex;

use crate::container::FixedContainer;
use crate::wait::Wait;

struct Ring<T, const N: usize> {
    buffer: [T; N],
    /// Index to extract from
    head: usize,
    /// Index to append at
    tail: usize,
}

impl<T: Copy, const N: usize> Ring<T, N> {
    const fn wrap(index: usize) -> usize {
        if index >= N {
            index - N
        } else {
            index
        }
    }

    fn len(&self) -> usize {
        if self.head <= self.tail {
            self.tail - self.head
        } else {
            N - self.head + self.tail
        }
    }

    fn continuous_len(&self) -> usize {
        if self.head <= self.tail {
            self.tail - self.head
        } else {
            N - self.head
        }
    }

    fn push(&mut self, item: T) {
        self.buffer[self.tail] = item;
        self.tail = Self::wrap(self.tail + 1);
    }

    fn pop(&mut self) -> T {
        let item = self.buffer[self.head];
        self.head = Self::wrap(self.head + 1);
        item
    }
}

/// Fixed-size queue
pub struct FixedQueue<T, const N: usize> {
    ring: SpinMutex<Ring<T, N>>,
}

impl<T: Copy, const N: usize> FixedQueue<T, N> {
    /// One slot stays vacant, so storage below 2 holds nothing
    const STORAGE_OK: () = assert!(N >= 2, "FixedQueue needs storage for at least 2 items");

    /// Empty queue; `blank` fills the unused storage
    pub const fn new(blank: T) -> Self {
        let () = Self::STORAGE_OK;
        Self {
            ring: SpinMutex::new(Ring {
                buffer: [blank; N],
                head: 0,
                tail: 0,
            }),
        }
    }

    /// Remove the head item, waiting for one if the queue is empty
    pub fn dequeue<W: Wait + ?Sized>(&self, waiter: &W) -> T {
        self.wait_item(waiter);
        self.ring.lock().pop()
    }

    /// Append at the tail, waiting for space if the queue is full
    pub fn enqueue<W: Wait + ?Sized>(&self, waiter: &W, item: T) {
        self.wait_empty(waiter);
        self.ring.lock().push(item);
    }

    /// Append without waiting. Returns false if the queue is full.
    pub fn try_enqueue(&self, item: T) -> bool {
        let mut ring = self.ring.lock();
        if ring.len() == N - 1 {
            return false;
        }
        ring.push(item);
        true
    }

    /// Remove the head item without waiting
    pub fn try_dequeue(&self) -> Option<T> {
        let mut ring = self.ring.lock();
        if ring.len() == 0 {
            return None;
        }
        Some(ring.pop())
    }

    /// Items stored contiguously from the head
    pub fn continuous_count(&self) -> usize {
        self.ring.lock().continuous_len()
    }

    /// Run `f` over a snapshot of the contiguous items starting at the head.
    ///
    /// Never crosses the end of storage, even when more items follow the
    /// wrap point. The queue is unlocked while `f` runs, so `f` may block;
    /// pair it with [`continuous_dequeue`](Self::continuous_dequeue) to
    /// consume what it processed.
    pub fn continuous_span<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let (snapshot, head, len) = {
            let ring = self.ring.lock();
            (ring.buffer, ring.head, ring.continuous_len())
        };
        f(&snapshot[head..head + len])
    }

    /// Drop `count` items from the head. `count` must not exceed
    /// `continuous_count()`.
    pub fn continuous_dequeue(&self, count: usize) {
        let mut ring = self.ring.lock();
        ring.head = Ring::<T, N>::wrap(ring.head + count);
    }

    /// Block until at least one item is stored contiguously from the head
    pub fn wait_continuous_item<W: Wait + ?Sized>(&self, waiter: &W) {
        if self.continuous_count() == 0 {
            waiter.wait_until(&|| self.continuous_count() != 0);
        }
    }
}

impl<T: Copy, const N: usize> FixedContainer for FixedQueue<T, N> {
    type Item = T;

    fn capacity(&self) -> usize {
        N - 1
    }

    fn item_count(&self) -> usize {
        self.ring.lock().len()
    }

    fn at(&self, index: usize) -> T {
        let ring = self.ring.lock();
        ring.buffer[Ring::<T, N>::wrap(ring.head + index)]
    }

    fn clear(&self) {
        let mut ring = self.ring.lock();
        ring.head = 0;
        ring.tail = 0;
    }
}
