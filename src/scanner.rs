//! Delimiter scan over a container with a bounded look-ahead
//!
//! Typical use is line framing: a reader task waits until a received-bytes
//! queue holds a full line or the line grew too long. The cursor survives
//! every suspension, so items already inspected are never checked again.

use core::cell::Cell;

use crate::container::FixedContainer;
use crate::wait::Wait;

/// Resumable scan for `delimiter` within the first `limit` items of a
/// container
pub struct ItemScanner<'a, C: FixedContainer> {
    container: &'a C,
    delimiter: C::Item,
    limit: usize,
    cursor: Cell<usize>,
}

impl<'a, C> ItemScanner<'a, C>
where
    C: FixedContainer,
    C::Item: PartialEq,
{
    /// Scanner positioned at the front of `container`
    pub fn new(container: &'a C, delimiter: C::Item, limit: usize) -> Self {
        Self {
            container,
            delimiter,
            limit,
            cursor: Cell::new(0),
        }
    }

    /// Advance over the items stored since the last call.
    ///
    /// Returns true once the delimiter is found or `limit` items were
    /// inspected. Returns false when the stored items run out first.
    pub fn poll(&self) -> bool {
        let mut cursor = self.cursor.get();
        let stop = loop {
            if cursor >= self.limit {
                break true;
            }
            if cursor >= self.container.item_count() {
                break false;
            }
            if self.container.at(cursor) == self.delimiter {
                break true;
            }
            cursor += 1;
        };
        self.cursor.set(cursor);
        stop
    }

    /// Block until `poll` succeeds
    pub fn wait<W: Wait + ?Sized>(&self, waiter: &W) {
        if !self.poll() {
            waiter.wait_until(&|| self.poll());
        }
    }

    /// Items inspected, not counting a found delimiter
    pub fn scanned_count(&self) -> usize {
        self.cursor.get()
    }

    /// Items inspected including the delimiter
    pub fn inclusive_count(&self) -> usize {
        if self.bound_reached() {
            self.cursor.get()
        } else {
            self.cursor.get() + 1
        }
    }

    /// Whether the scan stopped on `limit` rather than the delimiter
    pub fn bound_reached(&self) -> bool {
        self.cursor.get() >= self.limit
    }

    /// Start over from the front, e.g. after the caller consumed a line
    pub fn reset(&self) {
        self.cursor.set(0);
    }
}
