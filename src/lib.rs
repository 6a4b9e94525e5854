//! kreymborg-dispatch — Compact Cooperative Task Dispatcher
//!
//! Don't preempt, just queue.
//!
//! Minimal run-to-completion dispatcher for small embedded targets:
//! - Static task table (no heap, no allocation)
//! - FIFO ready queue threaded through the table
//! - Delta-encoded delay queue: aging by one tick touches only the head
//! - Tasks request reruns through their return value, no shared state
//! - Critical-section handle for tick ISR / main loop sharing
//!
//! Author: Moroya Sakamoto

#![cfg_attr(not(test), no_std)]

pub mod task;
pub mod error;
pub mod table;
pub mod ready;
pub mod delay;
pub mod dispatcher;
pub mod shared;
pub mod timer;
pub mod kernel;

pub use task::{Task, TaskId, Outcome, Ticks, TaskFn, FnTask};
pub use error::ScheduleError;
pub use table::{SlotId, TaskTable, MAX_TASKS, DEFAULT_TASKS};
pub use ready::ReadyQueue;
pub use delay::DelayQueue;
pub use dispatcher::{Dispatcher, DefaultDispatcher, DispatchStats, Running};
pub use shared::SharedDispatcher;
pub use timer::SysTimer;
pub use kernel::{Kernel, KernelConfig, KernelStats};
