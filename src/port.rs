//! Port layer contract
//!
//! Everything that touches raw stack memory or CPU registers sits behind
//! [`Port`]. The kernel only hands out task ids, stack regions and the
//! [`TaskStart`] trampoline handle.

use crate::task::TaskId;

/// Machine word size; stack budgets are counted in words.
pub const WORD_BYTES: usize = 4;

/// Stack memory reserved for one task. Grows down from `top`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    /// Highest address of the region
    pub top: usize,
    /// Capacity in machine words
    pub words: usize,
}

impl StackRegion {
    /// Capacity in bytes
    pub const fn bytes(&self) -> usize {
        self.words * WORD_BYTES
    }

    /// Lowest address of the region
    pub const fn bottom(&self) -> usize {
        self.top - self.bytes()
    }
}

/// Handle to the shared task trampoline.
///
/// A new task's first switch must land in [`TaskStart::enter`]. The
/// trampoline runs the slot's entry function, retires the task when it
/// returns, and loops for in-place rebuilds; it never returns.
pub struct TaskStart {
    kernel: *const (),
    enter: unsafe fn(*const ()) -> !,
}

// Points at a `'static` kernel.
unsafe impl Send for TaskStart {}

impl TaskStart {
    pub(crate) fn new(kernel: *const (), enter: unsafe fn(*const ()) -> !) -> Self {
        Self { kernel, enter }
    }

    /// Run the trampoline on the current stack.
    ///
    /// # Safety
    /// Must only be called by the port, once, as the first code executed on
    /// behalf of the task this handle was built for, after the kernel has
    /// switched to it.
    pub unsafe fn enter(self) -> ! {
        unsafe { (self.enter)(self.kernel) }
    }
}

/// Hardware port
pub trait Port: Sync + 'static {
    /// Record the current stack pointer as the base that task stacks are
    /// carved from. Called once by `Kernel::init`.
    fn capture_initial_stack(&self) -> usize;

    /// Construct the initial frame of a freshly registered task so that the
    /// next switch into `task` starts executing `start`.
    ///
    /// # Safety
    /// `region` must be memory reserved for `task` and unused by anything
    /// else.
    unsafe fn build_task_stack(&self, task: TaskId, region: StackRegion, start: TaskStart);

    /// Save the state of `from` and resume `to` where it last blocked (or at
    /// its trampoline). Returns when some later switch resumes `from`.
    ///
    /// # Safety
    /// `from` must be the task executing this call and `to` a live task
    /// whose stack was built.
    unsafe fn switch_context(&self, from: TaskId, to: TaskId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bounds() {
        let region = StackRegion { top: 0x2000_1000, words: 64 };
        assert_eq!(region.bytes(), 256);
        assert_eq!(region.bottom(), 0x2000_0F00);
    }

    #[test]
    fn test_task_start_enters_trampoline() {
        unsafe fn trampoline(arg: *const ()) -> ! {
            let value = unsafe { *arg.cast::<u32>() };
            std::panic!("entered with {value}");
        }
        let value = 7u32;
        let start = TaskStart::new((&value as *const u32).cast(), trampoline);
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
            start.enter()
        }));
        assert!(caught.is_err());
    }
}
