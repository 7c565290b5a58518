//! Kernel: top-level cooperative scheduler
//!
//! Owns the port, the task registry and the tick counter. Tasks run until
//! they call [`Wait::wait_until`] (directly or through a primitive built on
//! it); the kernel then stores the caller's predicate in its TCB, scans the
//! ring for a ready task and asks the port to switch to it.

use log::{debug, trace};
use spin::Mutex as SpinMutex;

use crate::port::{Port, StackRegion, TaskStart};
use crate::scheduler::{self, Registry, Ring};
use crate::task::{TaskFn, TaskId, TaskPriority, TaskState, WaitRequest, MAX_TASKS};
use crate::tick::TickCounter;
use crate::wait::Wait;

/// Cooperative kernel with a pool of `N` task slots (root included)
pub struct Kernel<P: Port, const N: usize = MAX_TASKS> {
    port: P,
    registry: SpinMutex<Registry<P, N>>,
    ticks: TickCounter,
}

impl<P: Port, const N: usize> Kernel<P, N> {
    /// Kernel with an empty pool. Call [`Kernel::init`] before anything else.
    pub const fn new(port: P) -> Self {
        Self {
            port,
            registry: SpinMutex::new(Registry::new()),
            ticks: TickCounter::new(),
        }
    }

    /// Adopt the calling context as the root task.
    ///
    /// Captures the current stack pointer through the port and reserves
    /// `root_stack_words` below it for the root; task stacks are carved
    /// underneath.
    pub fn init(&self, root_stack_words: usize) {
        let base = self.port.capture_initial_stack();
        self.registry.lock().init(base, root_stack_words);
        debug!("kernel up: stack base {base:#x}, root {root_stack_words} words, {N} slots");
    }

    /// Hardware port the kernel switches through
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Register a task to run after the calling one.
    ///
    /// Takes the first slot that was never built or that retired with at
    /// least `stack_words` of stack. A never-built slot gets a new stack
    /// region and a fresh frame; a retired slot is rebuilt in place on its
    /// existing stack. Returns `None` (and creates nothing) when no slot or
    /// stack space is left.
    ///
    /// A `Critical` request switches the scheduler to critical-first scans
    /// for the rest of execution, even if the request is dropped.
    pub fn create_task(
        &'static self,
        stack_words: usize,
        priority: TaskPriority,
        entry: TaskFn<P, N>,
    ) -> Option<TaskId> {
        let (id, fresh) = self.registry.lock().install(stack_words, priority, entry)?;
        match fresh {
            Some(region) => {
                debug!(
                    "{id} built: {stack_words} words at {:#x}, {priority:?}",
                    region.top
                );
                let start = TaskStart::new(self as *const Self as *const (), task_trampoline::<P, N>);
                // SAFETY: region was just carved for `id` and nothing else uses it
                unsafe { self.port.build_task_stack(id, region, start) };
            }
            None => debug!("{id} rebuilt in place, {priority:?}"),
        }
        Some(id)
    }

    /// Block the calling task for `duration` ticks
    pub fn wait_ticks(&self, duration: u32) {
        let future = self.ticks.future(duration);
        self.wait_until(&|| self.ticks.is_out(future));
    }

    /// Block until `ready` holds or `duration` ticks pass.
    ///
    /// Returns whether `ready` holds on resumption.
    pub fn wait_until_timeout(&self, ready: &dyn Fn() -> bool, duration: u32) -> bool {
        let deadline = self.ticks.deadline(duration);
        self.wait_until(&|| ready() || deadline.is_out(&self.ticks));
        ready()
    }

    /// Advance the tick counter. Call from the periodic tick interrupt.
    pub fn tick(&self) {
        self.ticks.advance();
    }

    /// Current tick
    pub fn ticks(&self) -> u32 {
        self.ticks.now()
    }

    /// Overwrite the tick counter
    pub fn set_ticks(&self, ticks: u32) {
        self.ticks.set(ticks);
    }

    /// Tick value `duration` ticks from now
    pub fn tick_future(&self, duration: u32) -> u32 {
        self.ticks.future(duration)
    }

    /// Has the counter reached `future`?
    pub fn tick_is_out(&self, future: u32) -> bool {
        self.ticks.is_out(future)
    }

    /// Underlying counter, for building [`Deadline`](crate::tick::Deadline)s
    pub fn tick_counter(&self) -> &TickCounter {
        &self.ticks
    }

    /// Task currently executing
    pub fn current(&self) -> TaskId {
        self.registry.lock().current()
    }

    /// Tasks in the ring, root included
    pub fn live_count(&self) -> usize {
        self.registry.lock().live_count()
    }

    /// Lifecycle state of a slot; `None` if `id` is outside the pool
    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        (id.index() < N).then(|| self.registry.lock().tcb(id).state)
    }

    /// Is `id` linked into the ring?
    pub fn is_live(&self, id: TaskId) -> bool {
        self.task_state(id) == Some(TaskState::Live)
    }

    /// Stack reserved for a slot, if it was ever built
    pub fn stack_region(&self, id: TaskId) -> Option<StackRegion> {
        if id.index() >= N {
            return None;
        }
        self.registry.lock().tcb(id).region()
    }

    /// Has a critical task ever been requested?
    pub fn critical_used(&self) -> bool {
        self.registry.lock().critical_used()
    }

    fn is_ready(&self, id: TaskId) -> bool {
        let wait = self.registry.lock().tcb(id).wait;
        match wait {
            None => true,
            // SAFETY: a stored request belongs to a task parked in `wait_until`
            Some(request) => unsafe { request.poll() },
        }
    }

    fn switch(&self, from: TaskId, to: TaskId) {
        self.registry.lock().set_current(to);
        trace!("switch {from} -> {to}");
        // SAFETY: `from` is executing this call; `to` is live and built
        unsafe { self.port.switch_context(from, to) };
    }

    /// Body of every task slot: run the entry, retire, repeat when rebuilt
    fn run_current(&'static self) -> ! {
        loop {
            let entry = {
                let registry = self.registry.lock();
                registry.tcb(registry.current()).entry
            };
            if let Some(entry) = entry {
                entry(self);
            }
            self.retire_current();
        }
    }

    fn retire_current(&self) {
        let (retired, successor) = {
            let mut registry = self.registry.lock();
            let id = registry.current();
            (id, registry.retire(id))
        };
        debug!("{retired} retired");
        let next = scheduler::round_robin(self, successor, |id| self.is_ready(id));
        self.switch(retired, next);
    }
}

/// Shared task entry handed to the port
///
/// # Safety
/// `kernel` must point at a `'static` `Kernel<P, N>`.
unsafe fn task_trampoline<P: Port, const N: usize>(kernel: *const ()) -> ! {
    let kernel: &'static Kernel<P, N> = unsafe { &*kernel.cast::<Kernel<P, N>>() };
    kernel.run_current()
}

impl<P: Port, const N: usize> Wait for Kernel<P, N> {
    fn wait_until(&self, ready: &dyn Fn() -> bool) {
        let (current, critical_first) = {
            let mut registry = self.registry.lock();
            let current = registry.current();
            registry.tcb_mut(current).wait = Some(WaitRequest::new(ready));
            (current, registry.critical_used())
        };

        let next = scheduler::select_next(self, current, critical_first, |id| self.is_ready(id));
        if next != current {
            self.switch(current, next);
        }

        // `ready` goes out of scope with this frame
        self.registry.lock().tcb_mut(current).wait = None;
    }
}

impl<P: Port, const N: usize> Ring for Kernel<P, N> {
    fn successor(&self, id: TaskId) -> TaskId {
        self.registry.lock().successor(id)
    }

    fn is_critical(&self, id: TaskId) -> bool {
        self.registry.lock().is_critical(id)
    }
}
