//! Kernel — dispatcher + tick timer driver loop
//!
//! Combines a dispatcher with a tick-period timer. Each `step` advances the
//! clock, ages the delay queue once per whole tick that elapsed, and then
//! runs at most one ready task. Used for host simulation and as the
//! reference main loop; on hardware the same shape is driven by a real tick
//! interrupt through [`crate::SharedDispatcher`].
//!
//! Author: Moroya Sakamoto

use crate::dispatcher::Dispatcher;
use crate::error::ScheduleError;
use crate::table::SlotId;
use crate::task::{Task, TaskId, Ticks};
use crate::timer::{SysTimer, DEFAULT_TICK_US};

/// Kernel configuration
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Tick period in microseconds
    pub tick_period_us: u32,
}

impl KernelConfig {
    /// Override the tick period
    pub const fn with_tick_period_us(self, tick_period_us: u32) -> Self {
        Self { tick_period_us }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tick_period_us: DEFAULT_TICK_US,
        }
    }
}

/// Dispatcher kernel
///
/// Total memory footprint:
/// - Task table: N × (sizeof(T) + 12) bytes
/// - Queues: 6 bytes
/// - Timer: 32 bytes
pub struct Kernel<T, const N: usize> {
    /// Task dispatcher
    pub dispatcher: Dispatcher<T, N>,
    /// Tick timer
    pub timer: SysTimer,
    /// Total steps executed
    pub total_steps: u64,
}

impl<T, const N: usize> Kernel<T, N> {
    /// Create kernel from configuration
    pub const fn new(config: KernelConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            timer: SysTimer::new(config.tick_period_us),
            total_steps: 0,
        }
    }

    /// Create kernel for testing (1 µs ticks)
    pub const fn testing() -> Self {
        Self::new(KernelConfig { tick_period_us: 1 })
    }

    /// Memory footprint estimate
    pub fn memory_footprint(&self) -> usize {
        core::mem::size_of::<Self>()
    }
}

impl<T: Task, const N: usize> Kernel<T, N> {
    /// Queue a task, `delay` ticks from now (`0` = ready)
    pub fn add_task(&mut self, task: T, delay: Ticks) -> Result<SlotId, ScheduleError> {
        self.dispatcher.schedule_after(task, delay)
    }

    /// Advance time by `delta_us`, age the delay queue for every tick that
    /// elapsed, then run at most one ready task.
    ///
    /// Returns the identity of the task that ran, if any.
    pub fn step(&mut self, delta_us: u64) -> Option<TaskId> {
        let ticks = self.timer.advance(delta_us);
        for _ in 0..ticks {
            self.dispatcher.tick();
        }
        self.total_steps += 1;

        self.dispatcher.run_next()
    }

    /// Run the kernel for a given duration (testing)
    pub fn run_for(&mut self, total_us: u64, step_us: u64) -> KernelStats {
        let step_us = step_us.max(1);
        let before = self.dispatcher.stats();
        let mut elapsed = 0u64;
        let mut tasks_executed = 0u64;
        let mut idle_steps = 0u64;

        while elapsed < total_us {
            if self.step(step_us).is_some() {
                tasks_executed += 1;
            } else {
                idle_steps += 1;
            }
            elapsed += step_us;
        }

        let after = self.dispatcher.stats();
        KernelStats {
            total_us: elapsed,
            total_ticks: self.timer.ticks(),
            tasks_executed,
            idle_steps,
            promoted: after.promoted.wrapping_sub(before.promoted),
            reruns: after.reruns.wrapping_sub(before.reruns),
        }
    }
}

/// Kernel execution statistics
#[derive(Debug, Clone)]
pub struct KernelStats {
    /// Total elapsed time (µs)
    pub total_us: u64,
    /// Total ticks since the timer was created
    pub total_ticks: u64,
    /// Task bodies run
    pub tasks_executed: u64,
    /// Steps that found the ready queue empty
    pub idle_steps: u64,
    /// Delay-queue promotions during the run
    pub promoted: u64,
    /// Rerun requests during the run
    pub reruns: u64,
}
