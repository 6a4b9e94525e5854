//! Interrupt-safe dispatcher handle
//!
//! The tick source usually lives in a timer ISR while `run_next` and
//! `schedule` are driven from the main loop. Every queue mutation here runs
//! inside a `critical_section`, so the ISR can never observe a half-linked
//! chain. Task bodies run *outside* the critical section: the slot is popped
//! in one section and re-admitted in a second, leaving interrupts enabled
//! while the body executes. A running body may schedule other tasks on the
//! same handle.
//!
//! ```ignore
//! static DISPATCH: SharedDispatcher<FnTask, 8> = SharedDispatcher::new();
//!
//! #[interrupt]
//! fn SysTick() {
//!     DISPATCH.tick();
//! }
//!
//! loop {
//!     DISPATCH.run_next();
//! }
//! ```
//!
//! Author: Moroya Sakamoto

use core::cell::RefCell;

use critical_section::Mutex;

use crate::dispatcher::Dispatcher;
use crate::error::ScheduleError;
use crate::table::SlotId;
use crate::task::{Task, TaskId, Ticks};

/// Dispatcher shared between a tick ISR and the main loop
pub struct SharedDispatcher<T, const N: usize> {
    inner: Mutex<RefCell<Dispatcher<T, N>>>,
}

impl<T, const N: usize> SharedDispatcher<T, N> {
    /// Create an empty shared dispatcher (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Dispatcher::new())),
        }
    }

    /// Run `f` with exclusive access to the dispatcher
    ///
    /// `f` runs with the tick source masked; keep it short. Calling
    /// [`run_next`](Self::run_next) or `with` from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&mut Dispatcher<T, N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Age the delay queue by one tick (ISR-safe)
    pub fn tick(&self) -> usize {
        self.with(|d| d.tick())
    }

    /// Drop every task
    pub fn reset(&self) {
        self.with(|d| d.reset())
    }
}

impl<T: Task, const N: usize> SharedDispatcher<T, N> {
    /// See [`Dispatcher::schedule`]
    pub fn schedule(&self, task: T) -> Result<SlotId, ScheduleError> {
        self.with(|d| d.schedule(task))
    }

    /// See [`Dispatcher::schedule_after`]
    pub fn schedule_after(&self, task: T, delay: Ticks) -> Result<SlotId, ScheduleError> {
        self.with(|d| d.schedule_after(task, delay))
    }

    /// Run the ready head with interrupts enabled
    ///
    /// Main loop only; never from a task body or an ISR.
    pub fn run_next(&self) -> Option<TaskId> {
        let mut running = self.with(|d| d.begin_run())?;
        let id = running.id();
        let outcome = running.run();
        self.with(|d| d.finish_run(running, outcome));
        Some(id)
    }
}

impl<T, const N: usize> Default for SharedDispatcher<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
