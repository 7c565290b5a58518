//! Hosted port: runs the kernel on a desktop OS
//!
//! Each built task is backed by one OS thread. A baton (mutex + condvar)
//! names the task allowed to run; every other thread sleeps on it, so task
//! code never executes concurrently and `switch_context` is a synchronous
//! handoff. Stack regions are bookkept by the kernel but execution uses the
//! threads' own stacks.

use std::format;
use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

use log::error;

use crate::port::{Port, StackRegion, TaskStart};
use crate::task::TaskId;

/// Fake stack base reported by `capture_initial_stack`
pub const HOSTED_STACK_BASE: usize = 0x2002_0000;

struct Baton {
    running: Mutex<TaskId>,
    turn: Condvar,
}

impl Baton {
    fn wait_turn(&self, task: TaskId) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        while *running != task {
            running = self.turn.wait(running).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn pass(&self, from: TaskId, to: TaskId) {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) = to;
        self.turn.notify_all();
        self.wait_turn(from);
    }

    fn holder(&self) -> TaskId {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread-backed port for tests and simulation
pub struct HostedPort {
    baton: Arc<Baton>,
    stack_base: usize,
}

impl HostedPort {
    /// Port reporting [`HOSTED_STACK_BASE`] as the initial stack
    pub fn new() -> Self {
        Self::with_stack_base(HOSTED_STACK_BASE)
    }

    /// Report `stack_base` as the initial stack pointer
    pub fn with_stack_base(stack_base: usize) -> Self {
        Self {
            baton: Arc::new(Baton {
                running: Mutex::new(TaskId::ROOT),
                turn: Condvar::new(),
            }),
            stack_base,
        }
    }

    /// Task currently holding the CPU
    pub fn running(&self) -> TaskId {
        self.baton.holder()
    }
}

impl Default for HostedPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Port for HostedPort {
    fn capture_initial_stack(&self) -> usize {
        self.stack_base
    }

    unsafe fn build_task_stack(&self, task: TaskId, _region: StackRegion, start: TaskStart) {
        let baton = Arc::clone(&self.baton);
        let spawned = thread::Builder::new()
            .name(format!("{task}"))
            .spawn(move || {
                baton.wait_turn(task);
                // SAFETY: first code run for `task`, after the kernel switched to it
                unsafe { start.enter() }
            });
        ensure_spawned(task, spawned);
    }

    unsafe fn switch_context(&self, from: TaskId, to: TaskId) {
        self.baton.pass(from, to);
    }
}

/// A slot without a thread would hang the first switch into it
fn ensure_spawned<T>(task: TaskId, spawned: io::Result<T>) {
    if let Err(err) = spawned {
        error!("hosted port: no thread for {task}: {err}");
        panic!("hosted port: no thread for {task}: {err}");
    }
}
