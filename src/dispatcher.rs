//! Cooperative dispatcher — admission, promotion, selection, rerun
//!
//! Non-preemptive: one task body runs at a time, to completion. Per slot:
//!
//! ```text
//! Free -> Queued(Ready | Delay) -> Running -> Free
//!                    ^                 |
//!                    +---- rerun ------+
//! ```
//!
//! A body asks to run again by returning [`Outcome::Rerun`] or
//! [`Outcome::RerunAfter`]; the slot is then re-linked without passing
//! through admission, so a rerun is never rejected as a duplicate of itself.
//!
//! Author: Moroya Sakamoto

use log::{debug, trace, warn};

use crate::delay::DelayQueue;
use crate::error::ScheduleError;
use crate::ready::ReadyQueue;
use crate::table::{SlotId, TaskTable, DEFAULT_TASKS};
use crate::task::{Outcome, Task, TaskId, Ticks};

/// Dispatcher with the default table capacity
pub type DefaultDispatcher<T> = Dispatcher<T, DEFAULT_TASKS>;

/// Dispatcher counters
///
/// All counters wrap on overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Ticks applied to the delay queue
    pub ticks: u64,
    /// Task bodies run
    pub dispatched: u64,
    /// Slots moved from the delay queue to the ready queue
    pub promoted: u64,
    /// Runs that ended in a rerun request
    pub reruns: u64,
    /// Slots returned to the free pool
    pub released: u64,
    /// Admissions refused (duplicate or table full)
    pub rejected: u64,
}

/// A task body taken off the ready queue, between [`Dispatcher::begin_run`]
/// and [`Dispatcher::finish_run`]
///
/// Its slot stays claimed, so the identity cannot be admitted again while it
/// runs. Dropping it instead of finishing leaves the slot claimed for good.
pub struct Running<T> {
    slot: SlotId,
    id: TaskId,
    task: T,
}

impl<T: Task> Running<T> {
    /// Identity of the running task
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Slot the task will return to
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Run the body to completion
    pub fn run(&mut self) -> Outcome {
        self.task.run()
    }
}

/// Fixed-capacity cooperative dispatcher
///
/// Static task table of `N` slots, no dynamic allocation.
pub struct Dispatcher<T, const N: usize> {
    table: TaskTable<T, N>,
    ready: ReadyQueue,
    delayed: DelayQueue,
    stats: DispatchStats,
}

impl<T, const N: usize> Dispatcher<T, N> {
    /// Create an empty dispatcher: every slot free, both queues empty
    pub const fn new() -> Self {
        Self {
            table: TaskTable::new(),
            ready: ReadyQueue::new(),
            delayed: DelayQueue::new(),
            stats: DispatchStats {
                ticks: 0,
                dispatched: 0,
                promoted: 0,
                reruns: 0,
                released: 0,
                rejected: 0,
            },
        }
    }

    /// Drop every task and return to the freshly-created state
    pub fn reset(&mut self) {
        self.table.clear();
        self.ready.clear();
        self.delayed.clear();
        self.stats = DispatchStats::default();
    }

    /// Age the delay queue by one tick
    ///
    /// Every task falling due is appended to the ready queue in wake order.
    /// Returns the number of tasks promoted.
    pub fn tick(&mut self) -> usize {
        self.stats.ticks = self.stats.ticks.wrapping_add(1);
        let promoted = self.delayed.tick(&mut self.table, &mut self.ready);
        self.stats.promoted = self.stats.promoted.wrapping_add(promoted as u64);
        promoted
    }

    /// Number of table slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Claimed slots (ready, delayed, or running)
    pub fn occupied(&self) -> usize {
        self.table.occupied()
    }

    /// Tasks waiting on the ready queue
    pub fn ready_len(&self) -> usize {
        self.ready.len(&self.table)
    }

    /// Tasks waiting on the delay queue
    pub fn delayed_len(&self) -> usize {
        self.delayed.len(&self.table)
    }

    /// Nothing ready to run right now
    pub fn is_idle(&self) -> bool {
        self.ready.is_empty()
    }

    /// Ticks until the next delayed task falls due
    pub fn next_due(&self) -> Option<Ticks> {
        self.delayed.next_due(&self.table)
    }

    /// Is `id` claimed anywhere (queued or running)?
    pub fn contains(&self, id: TaskId) -> bool {
        self.table.find(id).is_some()
    }

    /// Is `id` on the ready queue?
    pub fn is_ready(&self, id: TaskId) -> bool {
        self.ready().any(|queued| queued == id)
    }

    /// Ticks until `id` falls due, if it is on the delay queue
    pub fn due_in(&self, id: TaskId) -> Option<Ticks> {
        let slot = self.table.find(id)?;
        self.delayed.due_in(&self.table, slot)
    }

    /// Ready task identities in run order
    pub fn ready(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.ready.iter(&self.table).filter_map(move |slot| self.table.id(slot))
    }

    /// Delayed task identities with their ticks until due, in wake order
    pub fn delayed(&self) -> impl Iterator<Item = (TaskId, Ticks)> + '_ {
        self.delayed
            .iter(&self.table)
            .filter_map(move |(slot, due)| self.table.id(slot).map(|id| (id, due)))
    }

    /// Counters since creation or the last [`reset`](Self::reset)
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    #[cfg(test)]
    pub(crate) fn stats_mut(&mut self) -> &mut DispatchStats {
        &mut self.stats
    }
}

impl<T: Task, const N: usize> Dispatcher<T, N> {
    /// Queue `task` to run as soon as possible
    pub fn schedule(&mut self, task: T) -> Result<SlotId, ScheduleError> {
        self.schedule_after(task, 0)
    }

    /// Queue `task` to run after `delay` ticks (`0` = ready queue)
    ///
    /// Fails if the task's identity is already claimed or the table is full;
    /// the task is dropped in that case. Callers that want the fail-open
    /// behavior can ignore the error.
    pub fn schedule_after(&mut self, task: T, delay: Ticks) -> Result<SlotId, ScheduleError> {
        let slot = match self.table.admit(task) {
            Ok(slot) => slot,
            Err(err) => {
                self.stats.rejected = self.stats.rejected.wrapping_add(1);
                return Err(err);
            }
        };
        self.enqueue(slot, delay);
        Ok(slot)
    }

    /// Pop the ready head and take its body out of the table
    ///
    /// The caller must run it and hand it back through
    /// [`finish_run`](Self::finish_run) on this same dispatcher.
    pub fn begin_run(&mut self) -> Option<Running<T>> {
        let slot = self.ready.pop(&mut self.table)?;
        let id = self.table.id(slot)?;
        let task = self.table.take_task(slot)?;
        trace!("run {:?} '{}' from slot {}", id, task.name(), slot.index());
        Some(Running { slot, id, task })
    }

    /// Re-admit or release a task whose body has returned `outcome`
    ///
    /// If the slot no longer belongs to this run (the dispatcher was reset
    /// while the body ran), the body is dropped and the slot is left alone.
    pub fn finish_run(&mut self, running: Running<T>, outcome: Outcome) {
        let Running { slot, id, task } = running;
        if self.table.id(slot) != Some(id) || self.table.task(slot).is_some() {
            warn!("finish {:?} '{}': slot {} was reclaimed, dropping", id, task.name(), slot.index());
            return;
        }
        self.stats.dispatched = self.stats.dispatched.wrapping_add(1);
        self.table.set_link(slot, None);

        let delay = match outcome {
            Outcome::Done => {
                self.table.release(slot);
                self.stats.released = self.stats.released.wrapping_add(1);
                return;
            }
            Outcome::Rerun => 0,
            Outcome::RerunAfter(delay) => delay,
        };

        debug!("rerun {:?} '{}' after {} ticks", id, task.name(), delay);
        self.table.put_task(slot, task);
        self.stats.reruns = self.stats.reruns.wrapping_add(1);
        self.enqueue(slot, delay);
    }

    /// Run the task at the head of the ready queue
    ///
    /// Returns the identity of the task that ran, or `None` when nothing was
    /// ready. Must not be called from inside a task body.
    pub fn run_next(&mut self) -> Option<TaskId> {
        let mut running = self.begin_run()?;
        let id = running.id();
        let outcome = running.run();
        self.finish_run(running, outcome);
        Some(id)
    }

    /// Run ready tasks until the ready queue is empty, returning how many ran
    ///
    /// A task that keeps returning [`Outcome::Rerun`] keeps this loop busy;
    /// `limit` bounds the number of runs.
    pub fn run_ready(&mut self, limit: usize) -> usize {
        let mut ran = 0;
        while ran < limit && self.run_next().is_some() {
            ran += 1;
        }
        ran
    }

    fn enqueue(&mut self, slot: SlotId, delay: Ticks) {
        if delay == 0 {
            self.ready.push(&mut self.table, slot);
        } else {
            self.delayed.insert(&mut self.table, slot, delay);
        }
    }
}

impl<T, const N: usize> Default for Dispatcher<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
