//! Task control blocks: static, no-alloc task descriptors
//!
//! Every pool slot holds one TCB for the whole program lifetime. A slot is
//! built once (stack carved, frame constructed by the port) and may later be
//! rebuilt in place after its task retires; its stack is never resized.

use core::fmt;
use core::ptr::NonNull;

use crate::kernel::Kernel;
use crate::port::{Port, StackRegion};

/// Default task pool capacity (root task included)
pub const MAX_TASKS: usize = 16;

/// Task body. Invoked once per task lifetime; returning retires the task.
///
/// Whatever the task needs (its "context") is captured by the closure.
pub type TaskFn<P, const N: usize> = &'static (dyn Fn(&'static Kernel<P, N>) + Sync);

/// Pool slot index of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// The task established by `Kernel::init` (the main loop)
    pub const ROOT: TaskId = TaskId(0);

    /// Slot index in the task pool
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Scheduling tier. Critical tasks are polled first on every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskPriority {
    /// Round-robin with everything else
    #[default]
    Normal,
    /// Polling tasks that must react as fast as possible
    Critical,
}

/// Slot lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Slot never allocated a stack
    Unbuilt,
    /// Linked into the ring (running, runnable or waiting)
    Live,
    /// Entry function returned; stack kept for an in-place rebuild
    Retired,
}

/// Readiness predicate a parked task is waiting on.
///
/// The predicate lives in the waiting task's own frame; the pointer is only
/// stored while that task is suspended inside `wait_until`.
#[derive(Clone, Copy)]
pub(crate) struct WaitRequest(NonNull<dyn Fn() -> bool>);

// Only one task executes at a time; the request is polled by whichever task
// is currently scanning the ring.
unsafe impl Send for WaitRequest {}

impl WaitRequest {
    pub(crate) fn new(ready: &dyn Fn() -> bool) -> Self {
        let short: NonNull<dyn Fn() -> bool + '_> = NonNull::from(ready);
        // SAFETY: lifetime erasure only; dereferenced exclusively through `poll`
        Self(unsafe {
            core::mem::transmute::<NonNull<dyn Fn() -> bool + '_>, NonNull<dyn Fn() -> bool + 'static>>(
                short,
            )
        })
    }

    /// # Safety
    /// The frame that created this request must still be parked in
    /// `wait_until`.
    pub(crate) unsafe fn poll(&self) -> bool {
        let ready = unsafe { self.0.as_ref() };
        ready()
    }
}

/// Task control block
pub(crate) struct Tcb<P: Port, const N: usize> {
    /// Top of the reserved stack region
    pub stack_top: usize,
    /// Reserved stack capacity in machine words
    pub stack_words: usize,
    /// Ring successor
    pub next: TaskId,
    /// What the task is parked on (`None` = ready)
    pub wait: Option<WaitRequest>,
    /// Task body (`None` for the root task)
    pub entry: Option<TaskFn<P, N>>,
    pub priority: TaskPriority,
    pub state: TaskState,
}

impl<P: Port, const N: usize> Tcb<P, N> {
    /// Slot that has never been built
    pub const EMPTY: Self = Self {
        stack_top: 0,
        stack_words: 0,
        next: TaskId::ROOT,
        wait: None,
        entry: None,
        priority: TaskPriority::Normal,
        state: TaskState::Unbuilt,
    };

    /// Can this slot host a task needing `stack_words`?
    pub fn accepts(&self, stack_words: usize) -> bool {
        match self.state {
            TaskState::Unbuilt => true,
            TaskState::Retired => stack_words <= self.stack_words,
            TaskState::Live => false,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.priority == TaskPriority::Critical
    }

    pub fn region(&self) -> Option<StackRegion> {
        match self.state {
            TaskState::Unbuilt => None,
            _ => Some(StackRegion {
                top: self.stack_top,
                words: self.stack_words,
            }),
        }
    }
}
