//! coop-rtos: cooperative multitasking for single-core microcontrollers
//!
//! Tasks run until they block on a readiness predicate; the scheduler then
//! polls its siblings' predicates and hands the CPU to the first ready one.
//! - Fixed task pool, bump-allocated stacks, slots rebuilt in place
//! - Two priority tiers (critical tasks are polled first)
//! - One blocking primitive; mutex, semaphore and containers built on it
//! - No heap, no preemption

#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod task;
mod scheduler;
pub mod kernel;
pub mod port;
#[cfg(any(test, feature = "std"))]
pub mod hosted;
pub mod tick;
pub mod wait;
pub mod sync;
pub mod container;
pub mod queue;
pub mod stack;
pub mod buffer;
pub mod scanner;
pub mod pack;

pub use task::{TaskId, TaskPriority, TaskState, TaskFn, MAX_TASKS};
pub use kernel::Kernel;
pub use port::{Port, StackRegion, TaskStart, WORD_BYTES};
#[cfg(any(test, feature = "std"))]
pub use hosted::HostedPort;
pub use tick::{TickCounter, Deadline};
pub use wait::Wait;
pub use sync::{Mutex, MutexGuard, Semaphore, SemaphoreGuard};
pub use container::FixedContainer;
pub use queue::FixedQueue;
pub use stack::FixedStack;
pub use buffer::FixedBuffer;
pub use scanner::ItemScanner;
