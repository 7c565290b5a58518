//! Common interface of the fixed-capacity containers
//!
//! Occupancy queries plus four wait helpers. The helpers check first and
//! only block when the condition does not already hold.

use crate::wait::Wait;

/// Fixed-capacity container with built-in backpressure
pub trait FixedContainer {
    /// Stored item type
    type Item: Copy;

    /// Items the container can hold at once
    fn capacity(&self) -> usize;

    /// Items currently stored
    fn item_count(&self) -> usize;

    /// Free slots
    fn empty_count(&self) -> usize {
        self.capacity() - self.item_count()
    }

    /// Item at `index`, counted from the logical front.
    ///
    /// Panics if `index` is outside the backing storage; indices past
    /// `item_count()` read stale slots.
    fn at(&self, index: usize) -> Self::Item;

    /// Drop every item
    fn clear(&self);

    /// No items stored
    fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// No free slots
    fn is_full(&self) -> bool {
        self.empty_count() == 0
    }

    /// Block until at least one item is stored
    fn wait_item<W: Wait + ?Sized>(&self, waiter: &W) {
        if self.item_count() == 0 {
            waiter.wait_until(&|| self.item_count() != 0);
        }
    }

    /// Block until at least `count` items are stored
    fn wait_item_count<W: Wait + ?Sized>(&self, waiter: &W, count: usize) {
        if self.item_count() < count {
            waiter.wait_until(&|| self.item_count() >= count);
        }
    }

    /// Block until at least one slot is free
    fn wait_empty<W: Wait + ?Sized>(&self, waiter: &W) {
        if self.empty_count() == 0 {
            waiter.wait_until(&|| self.empty_count() != 0);
        }
    }

    /// Block until at least `count` slots are free
    fn wait_empty_count<W: Wait + ?Sized>(&self, waiter: &W, count: usize) {
        if self.empty_count() < count {
            waiter.wait_until(&|| self.empty_count() >= count);
        }
    }
}
