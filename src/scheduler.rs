//! Task registry and ready scan
//!
//! The pool is a fixed array of TCBs; live tasks form a ring through each
//! slot's `next` index. Selection walks the ring from the caller's successor
//! polling readiness predicates:
//! 1. once any critical task exists, a single bounded lap over critical
//!    tasks only, stopping short of the caller;
//! 2. otherwise (or if that lap found nothing) an unbounded round-robin walk
//!    over every task, the caller included, until one is ready.

use log::warn;

use crate::port::{Port, StackRegion, WORD_BYTES};
use crate::task::{TaskFn, TaskId, TaskPriority, TaskState, Tcb};

/// Ring topology needed by the selection walk
pub(crate) trait Ring {
    fn successor(&self, id: TaskId) -> TaskId;
    fn is_critical(&self, id: TaskId) -> bool;
}

/// Pick the task to run after `current` blocked.
///
/// May not return if no predicate ever becomes true.
pub(crate) fn select_next<R, F>(ring: &R, current: TaskId, critical_first: bool, mut ready: F) -> TaskId
where
    R: Ring + ?Sized,
    F: FnMut(TaskId) -> bool,
{
    let start = ring.successor(current);
    if critical_first {
        let mut id = start;
        while id != current {
            if ring.is_critical(id) && ready(id) {
                return id;
            }
            id = ring.successor(id);
        }
    }
    round_robin(ring, start, ready)
}

/// First ready task walking the ring from `start`, lapping as often as needed
pub(crate) fn round_robin<R, F>(ring: &R, start: TaskId, mut ready: F) -> TaskId
where
    R: Ring + ?Sized,
    F: FnMut(TaskId) -> bool,
{
    let mut id = start;
    while !ready(id) {
        id = ring.successor(id);
    }
    id
}

/// Fixed task pool plus the scheduler's global state
pub(crate) struct Registry<P: Port, const N: usize> {
    tcbs: [Tcb<P, N>; N],
    current: TaskId,
    /// Set by the first critical creation request, never cleared
    critical_used: bool,
    /// Next free stack address; stacks are carved downwards
    stack_cursor: usize,
}

impl<P: Port, const N: usize> Registry<P, N> {
    pub const fn new() -> Self {
        Self {
            tcbs: [Tcb::EMPTY; N],
            current: TaskId::ROOT,
            critical_used: false,
            stack_cursor: 0,
        }
    }

    /// Turn slot 0 into the root task owning the stack at `stack_base`
    pub fn init(&mut self, stack_base: usize, root_stack_words: usize) {
        let root = &mut self.tcbs[TaskId::ROOT.index()];
        root.stack_top = stack_base;
        root.stack_words = root_stack_words;
        root.next = TaskId::ROOT;
        root.wait = None;
        root.entry = None;
        root.state = TaskState::Live;
        self.current = TaskId::ROOT;
        self.stack_cursor = stack_base.saturating_sub(root_stack_words.saturating_mul(WORD_BYTES));
    }

    pub fn tcb(&self, id: TaskId) -> &Tcb<P, N> {
        &self.tcbs[id.index()]
    }

    pub fn tcb_mut(&mut self, id: TaskId) -> &mut Tcb<P, N> {
        &mut self.tcbs[id.index()]
    }

    pub fn current(&self) -> TaskId {
        self.current
    }

    pub fn set_current(&mut self, id: TaskId) {
        self.current = id;
    }

    pub fn critical_used(&self) -> bool {
        self.critical_used
    }

    #[cfg(test)]
    pub fn stack_cursor(&self) -> usize {
        self.stack_cursor
    }

    /// First slot that is unbuilt or retired with enough stack
    pub fn find_slot(&self, stack_words: usize) -> Option<TaskId> {
        self.tcbs
            .iter()
            .position(|tcb| tcb.accepts(stack_words))
            .map(TaskId)
    }

    /// Register a task after the current one.
    ///
    /// Returns the slot and, when the slot was built fresh, the stack region
    /// the port must construct a frame in. `None` drops the request.
    pub fn install(
        &mut self,
        stack_words: usize,
        priority: TaskPriority,
        entry: TaskFn<P, N>,
    ) -> Option<(TaskId, Option<StackRegion>)> {
        if priority == TaskPriority::Critical {
            self.critical_used = true;
        }
        let Some(id) = self.find_slot(stack_words) else {
            warn!("task pool exhausted, dropping request for {stack_words} words");
            return None;
        };

        let fresh = if self.tcb(id).state == TaskState::Unbuilt {
            let cursor = stack_words
                .checked_mul(WORD_BYTES)
                .and_then(|bytes| self.stack_cursor.checked_sub(bytes));
            let Some(cursor) = cursor else {
                warn!("stack space exhausted, dropping request for {stack_words} words");
                return None;
            };
            let region = StackRegion {
                top: self.stack_cursor,
                words: stack_words,
            };
            self.stack_cursor = cursor;
            let tcb = self.tcb_mut(id);
            tcb.stack_top = region.top;
            tcb.stack_words = region.words;
            Some(region)
        } else {
            None
        };

        let tcb = self.tcb_mut(id);
        tcb.entry = Some(entry);
        tcb.wait = None;
        tcb.priority = priority;
        tcb.state = TaskState::Live;
        self.link_after(self.current, id);
        Some((id, fresh))
    }

    fn link_after(&mut self, anchor: TaskId, id: TaskId) {
        self.tcbs[id.index()].next = self.tcbs[anchor.index()].next;
        self.tcbs[anchor.index()].next = id;
    }

    /// Unlink `id` from the ring and mark it retired; returns its successor
    pub fn retire(&mut self, id: TaskId) -> TaskId {
        let successor = self.tcb(id).next;
        let mut prev = id;
        while self.tcb(prev).next != id {
            prev = self.tcb(prev).next;
        }
        self.tcb_mut(prev).next = successor;

        let tcb = self.tcb_mut(id);
        tcb.state = TaskState::Retired;
        tcb.wait = None;
        tcb.entry = None;
        successor
    }

    /// Number of tasks in the ring
    pub fn live_count(&self) -> usize {
        let mut count = 1;
        let mut id = self.tcb(self.current).next;
        while id != self.current {
            count += 1;
            id = self.tcb(id).next;
        }
        count
    }
}

impl<P: Port, const N: usize> Ring for Registry<P, N> {
    fn successor(&self, id: TaskId) -> TaskId {
        self.tcb(id).next
    }

    fn is_critical(&self, id: TaskId) -> bool {
        self.tcb(id).is_critical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosted::testing::task;
    use crate::hosted::HostedPort;
    use std::vec::Vec;

    const BASE: usize = 0x2000_8000;

    type Reg = Registry<HostedPort, 4>;

    fn registry() -> Reg {
        let mut reg = Reg::new();
        reg.init(BASE, 128);
        reg
    }

    fn install(reg: &mut Reg, words: usize, priority: TaskPriority) -> Option<TaskId> {
        reg.install(words, priority, task(|_| {})).map(|(id, _)| id)
    }

    fn ring_order(reg: &Reg) -> Vec<usize> {
        let mut order = std::vec![reg.current().index()];
        let mut id = reg.successor(reg.current());
        while id != reg.current() {
            order.push(id.index());
            id = reg.successor(id);
        }
        order
    }

    #[test]
    fn test_init_root() {
        let reg = registry();
        assert_eq!(reg.current(), TaskId::ROOT);
        assert_eq!(reg.live_count(), 1);
        assert_eq!(reg.successor(TaskId::ROOT), TaskId::ROOT);
        assert_eq!(reg.stack_cursor(), BASE - 128 * WORD_BYTES);
    }

    #[test]
    fn test_install_carves_stack_and_links_after_current() {
        let mut reg = registry();
        let (a, region) = reg.install(64, TaskPriority::Normal, task(|_| {})).unwrap();
        assert_eq!(a, TaskId(1));
        let region = region.unwrap();
        assert_eq!(region.top, BASE - 128 * WORD_BYTES);
        assert_eq!(region.words, 64);
        assert_eq!(reg.stack_cursor(), region.bottom());

        let b = install(&mut reg, 32, TaskPriority::Normal).unwrap();
        assert_eq!(ring_order(&reg), [0, b.index(), a.index()]);
    }

    #[test]
    fn test_pool_exhaustion_drops_request() {
        let mut reg = registry();
        for _ in 1..4 {
            assert!(install(&mut reg, 16, TaskPriority::Normal).is_some());
        }
        let cursor = reg.stack_cursor();
        assert!(install(&mut reg, 16, TaskPriority::Normal).is_none());
        assert_eq!(reg.live_count(), 4);
        assert_eq!(reg.stack_cursor(), cursor);
    }

    #[test]
    fn test_stack_exhaustion_drops_request() {
        let mut reg = Reg::new();
        reg.init(1024, 128);
        assert!(install(&mut reg, 129, TaskPriority::Normal).is_none());
        assert_eq!(reg.live_count(), 1);
        assert!(install(&mut reg, 128, TaskPriority::Normal).is_some());
    }

    #[test]
    fn test_oversized_budget_dropped_without_overflow() {
        let mut reg = registry();
        let cursor = reg.stack_cursor();
        assert!(install(&mut reg, usize::MAX / WORD_BYTES + 1, TaskPriority::Normal).is_none());
        assert!(install(&mut reg, usize::MAX, TaskPriority::Normal).is_none());
        assert_eq!(reg.stack_cursor(), cursor);
        assert_eq!(reg.live_count(), 1);
        assert!(install(&mut reg, 16, TaskPriority::Normal).is_some());
    }

    #[test]
    fn test_init_with_oversized_root_saturates() {
        let mut reg = Reg::new();
        reg.init(BASE, usize::MAX);
        assert_eq!(reg.stack_cursor(), 0);
        assert!(install(&mut reg, 1, TaskPriority::Normal).is_none());
    }

    #[test]
    fn test_retire_unlinks_and_keeps_stack() {
        let mut reg = registry();
        let a = install(&mut reg, 64, TaskPriority::Normal).unwrap();
        let b = install(&mut reg, 64, TaskPriority::Normal).unwrap();
        let region = reg.tcb(a).region();

        // ring: root -> b -> a -> root
        assert_eq!(reg.retire(a), TaskId::ROOT);
        assert_eq!(ring_order(&reg), [0, b.index()]);
        assert_eq!(reg.tcb(a).state, TaskState::Retired);
        assert_eq!(reg.tcb(a).region(), region);
    }

    #[test]
    fn test_retired_slot_rebuilt_in_place() {
        let mut reg = registry();
        let a = install(&mut reg, 64, TaskPriority::Normal).unwrap();
        reg.retire(a);
        let cursor = reg.stack_cursor();

        // Too big for the retired slot: takes a fresh one
        let (big, fresh) = reg.install(65, TaskPriority::Normal, task(|_| {})).unwrap();
        assert_ne!(big, a);
        assert!(fresh.is_some());

        let cursor_after_big = reg.stack_cursor();
        assert!(cursor_after_big < cursor);
        let (small, fresh) = reg.install(32, TaskPriority::Normal, task(|_| {})).unwrap();
        assert_eq!(small, a);
        assert!(fresh.is_none());
        assert_eq!(reg.tcb(a).stack_words, 64);
        assert_eq!(reg.stack_cursor(), cursor_after_big);
    }

    #[test]
    fn test_critical_flag_is_sticky() {
        let mut reg = registry();
        assert!(!reg.critical_used());
        let c = install(&mut reg, 16, TaskPriority::Critical).unwrap();
        assert!(reg.critical_used());
        reg.retire(c);
        assert!(reg.critical_used());
    }

    #[test]
    fn test_critical_flag_set_even_when_dropped() {
        let mut reg = Reg::new();
        reg.init(64, 16);
        assert!(install(&mut reg, 1024, TaskPriority::Critical).is_none());
        assert!(reg.critical_used());
    }

    #[test]
    fn test_round_robin_follows_ring() {
        let mut reg = registry();
        let a = install(&mut reg, 16, TaskPriority::Normal).unwrap();
        let b = install(&mut reg, 16, TaskPriority::Normal).unwrap();
        // ring: root -> b -> a
        let next = select_next(&reg, TaskId::ROOT, false, |_| true);
        assert_eq!(next, b);
        let next = select_next(&reg, TaskId::ROOT, false, |id| id == a);
        assert_eq!(next, a);
    }

    #[test]
    fn test_caller_selected_last() {
        let mut reg = registry();
        install(&mut reg, 16, TaskPriority::Normal).unwrap();
        install(&mut reg, 16, TaskPriority::Normal).unwrap();
        let mut visited = Vec::new();
        let next = select_next(&reg, TaskId::ROOT, false, |id| {
            visited.push(id.index());
            id == TaskId::ROOT
        });
        assert_eq!(next, TaskId::ROOT);
        assert_eq!(visited, [2, 1, 0]);
    }

    #[test]
    fn test_unbounded_scan_laps() {
        let mut reg = registry();
        let a = install(&mut reg, 16, TaskPriority::Normal).unwrap();
        let mut polls = 0;
        // `a` becomes ready on its third poll
        let next = select_next(&reg, TaskId::ROOT, false, |id| {
            if id == a {
                polls += 1;
                polls == 3
            } else {
                false
            }
        });
        assert_eq!(next, a);
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_critical_preferred() {
        let mut reg = registry();
        let c = install(&mut reg, 16, TaskPriority::Critical).unwrap();
        let n = install(&mut reg, 16, TaskPriority::Normal).unwrap();
        // ring: root -> n -> c; both ready
        assert_eq!(select_next(&reg, TaskId::ROOT, true, |_| true), c);
        assert_eq!(select_next(&reg, TaskId::ROOT, false, |_| true), n);
    }

    #[test]
    fn test_critical_lap_is_bounded() {
        let mut reg = registry();
        let c = install(&mut reg, 16, TaskPriority::Critical).unwrap();
        let n = install(&mut reg, 16, TaskPriority::Normal).unwrap();
        let mut visited = Vec::new();
        let next = select_next(&reg, TaskId::ROOT, true, |id| {
            visited.push(id.index());
            id == n
        });
        assert_eq!(next, n);
        // critical lap polls `c` once (skips `n`, stops before root),
        // then the round-robin walk starts at `n`
        assert_eq!(visited, [c.index(), n.index()]);
    }

    #[test]
    fn test_critical_pass_skips_caller() {
        let mut reg = registry();
        let c = install(&mut reg, 16, TaskPriority::Critical).unwrap();
        // A critical caller is not picked by the critical lap
        let next = select_next(&reg, c, true, |id| id == c);
        assert_eq!(next, c);
    }
}
