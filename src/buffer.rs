//! Fixed-size contiguous buffer with insert/remove anywhere
//!
//! Inserting or removing shifts every trailing item, so cost is linear in
//! the number of items behind the position.

use spin::Mutex as SpinMutex;

use crate::container::FixedContainer;
use crate::wait::Wait;

struct Items<T, const N: usize> {
    buffer: [T; N],
    len: usize,
}

/// Fixed-size buffer
pub struct FixedBuffer<T, const N: usize> {
    items: SpinMutex<Items<T, N>>,
}

impl<T: Copy, const N: usize> FixedBuffer<T, N> {
    /// Empty buffer; `blank` fills the unused storage
    pub const fn new(blank: T) -> Self {
        Self {
            items: SpinMutex::new(Items {
                buffer: [blank; N],
                len: 0,
            }),
        }
    }

    /// Append one item, waiting for a free slot
    pub fn append<W: Wait + ?Sized>(&self, waiter: &W, item: T) {
        self.wait_empty(waiter);
        let mut items = self.items.lock();
        let len = items.len;
        items.buffer[len] = item;
        items.len += 1;
    }

    /// Append a block, waiting until all of it fits
    pub fn append_slice<W: Wait + ?Sized>(&self, waiter: &W, block: &[T]) {
        self.wait_empty_count(waiter, block.len());
        let mut items = self.items.lock();
        let len = items.len;
        items.buffer[len..len + block.len()].copy_from_slice(block);
        items.len += block.len();
    }

    /// Insert one item at `pos` (at most `item_count()`), shifting the rest
    /// right
    pub fn insert<W: Wait + ?Sized>(&self, waiter: &W, pos: usize, item: T) {
        self.insert_slice(waiter, pos, core::slice::from_ref(&item));
    }

    /// Insert a block at `pos`, shifting the rest right
    pub fn insert_slice<W: Wait + ?Sized>(&self, waiter: &W, pos: usize, block: &[T]) {
        self.wait_empty_count(waiter, block.len());
        let mut items = self.items.lock();
        let len = items.len;
        debug_assert!(pos <= len);
        items.buffer.copy_within(pos..len, pos + block.len());
        items.buffer[pos..pos + block.len()].copy_from_slice(block);
        items.len += block.len();
    }

    /// Remove the item at `pos`, waiting for at least one item
    pub fn remove<W: Wait + ?Sized>(&self, waiter: &W, pos: usize) {
        self.remove_range(waiter, pos, 1);
    }

    /// Remove `count` items starting at `pos`, waiting for at least `count`
    /// items to be stored
    pub fn remove_range<W: Wait + ?Sized>(&self, waiter: &W, pos: usize, count: usize) {
        self.wait_item_count(waiter, count);
        let mut items = self.items.lock();
        let len = items.len;
        debug_assert!(pos + count <= len);
        items.buffer.copy_within(pos + count..len, pos);
        items.len -= count;
    }

    /// Run `f` over a snapshot of the stored items.
    ///
    /// The buffer is unlocked while `f` runs, so `f` may block or modify the
    /// buffer; it keeps seeing the items as they were on entry.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let (snapshot, len) = {
            let items = self.items.lock();
            (items.buffer, items.len)
        };
        f(&snapshot[..len])
    }
}

impl<T: Copy, const N: usize> FixedContainer for FixedBuffer<T, N> {
    type Item = T;

    fn capacity(&self) -> usize {
        N
    }

    fn item_count(&self) -> usize {
        self.items.lock().len
    }

    fn at(&self, index: usize) -> T {
        self.items.lock().buffer[index]
    }

    fn clear(&self) {
        self.items.lock().len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosted::testing::{kernel, leak, task};
    use crate::task::TaskPriority;
    use crate::wait::Immediate;
    use core::sync::atomic::{AtomicUsize, Ordering};

    fn contents<const N: usize>(buffer: &FixedBuffer<u8, N>) -> std::vec::Vec<u8> {
        buffer.with_items(|items| items.to_vec())
    }

    #[test]
    fn test_append() {
        let buffer = FixedBuffer::<u8, 8>::new(0);
        buffer.append(&Immediate, 1);
        buffer.append_slice(&Immediate, &[2, 3, 4]);
        assert_eq!(contents(&buffer), [1, 2, 3, 4]);
        assert_eq!(buffer.empty_count(), 4);
    }

    #[test]
    fn test_insert_shifts_suffix() {
        let buffer = FixedBuffer::<u8, 8>::new(0);
        buffer.append_slice(&Immediate, &[1, 4]);
        buffer.insert(&Immediate, 1, 3);
        buffer.insert(&Immediate, 0, 0);
        assert_eq!(contents(&buffer), [0, 1, 3, 4]);
        buffer.insert_slice(&Immediate, 2, &[2, 2]);
        assert_eq!(contents(&buffer), [0, 1, 2, 2, 3, 4]);
        buffer.insert(&Immediate, 6, 5);
        assert_eq!(contents(&buffer), [0, 1, 2, 2, 3, 4, 5]);
    }

    #[test]
    fn test_remove_shifts_suffix() {
        let buffer = FixedBuffer::<u8, 8>::new(0);
        buffer.append_slice(&Immediate, &[0, 1, 2, 3, 4, 5]);
        buffer.remove(&Immediate, 0);
        assert_eq!(contents(&buffer), [1, 2, 3, 4, 5]);
        buffer.remove_range(&Immediate, 1, 2);
        assert_eq!(contents(&buffer), [1, 4, 5]);
        buffer.remove_range(&Immediate, 1, 2);
        assert_eq!(contents(&buffer), [1]);
        assert_eq!(buffer.at(0), 1);
    }

    #[test]
    fn test_clear() {
        let buffer = FixedBuffer::<u8, 4>::new(0);
        buffer.append_slice(&Immediate, &[1, 2]);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.empty_count(), 4);
    }

    #[test]
    fn test_block_append_waits_for_room() {
        let k = kernel::<4>();
        let buffer = leak(FixedBuffer::<u8, 4>::new(0));
        buffer.append_slice(k, &[1, 2, 3]);
        k.create_task(
            64,
            TaskPriority::Normal,
            task(|k| buffer.append_slice(k, &[7, 8])),
        )
        .unwrap();

        k.yield_now();
        assert_eq!(buffer.item_count(), 3);
        buffer.remove(k, 0);
        k.yield_now();
        assert_eq!(contents(buffer), [2, 3, 7, 8]);
    }

    #[test]
    fn test_with_items_may_block() {
        let k = kernel::<4>();
        let buffer = leak(FixedBuffer::<u8, 4>::new(0));
        let seen = leak(AtomicUsize::new(0));
        k.create_task(
            64,
            TaskPriority::Normal,
            task(|k| {
                buffer.wait_item_count(k, 2);
                seen.store(buffer.item_count(), Ordering::Relaxed);
                buffer.append(k, 9);
            }),
        )
        .unwrap();
        k.yield_now();

        buffer.append_slice(k, &[1, 2]);
        let snapshot = buffer.with_items(|items| {
            k.yield_now();
            items.to_vec()
        });
        assert_eq!(snapshot, [1, 2]);
        assert_eq!(seen.load(Ordering::Relaxed), 2);
        assert_eq!(contents(buffer), [1, 2, 9]);
    }
}
