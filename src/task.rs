//! Task definition — identity token, run outcome, and the `Task` trait
//!
//! A task is an opaque unit of work that runs to completion and tells the
//! dispatcher what to do with it next. Identity is an explicit token, so two
//! scheduled units compare equal only when they name the same task.
//!
//! Author: Moroya Sakamoto

/// Dispatcher time unit (one tick of the periodic tick source)
pub type Ticks = u32;

/// Task identity token
///
/// At most one slot in a dispatcher carries a given `TaskId` at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u16);

/// What a task body asks for when it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Finished; the slot is released
    Done,
    /// Run again as soon as possible (ready queue tail)
    Rerun,
    /// Run again after the given number of ticks
    RerunAfter(Ticks),
}

impl Outcome {
    /// Rerun request: `0` re-admits to the ready queue, anything else to the
    /// delay queue.
    pub const fn rerun(delay: Ticks) -> Self {
        if delay == 0 {
            Outcome::Rerun
        } else {
            Outcome::RerunAfter(delay)
        }
    }

    /// Does this outcome keep the slot claimed?
    pub fn is_rerun(&self) -> bool {
        !matches!(self, Outcome::Done)
    }
}

/// A schedulable unit of work
pub trait Task {
    /// Identity used for duplicate detection
    fn id(&self) -> TaskId;

    /// Run to completion. Must not call back into the dispatcher that is
    /// running it.
    fn run(&mut self) -> Outcome;

    /// Short name for log output
    fn name(&self) -> &str {
        ""
    }
}

/// Task body function pointer
pub type TaskFn = fn() -> Outcome;

/// Plain function task — a `TaskFn` paired with an explicit identity
#[derive(Clone, Copy)]
pub struct FnTask {
    id: TaskId,
    /// Task name (8 ASCII chars max)
    name: [u8; 8],
    func: TaskFn,
}

impl FnTask {
    /// Create a function task
    pub fn new(id: TaskId, name: &[u8], func: TaskFn) -> Self {
        let mut n = [0u8; 8];
        let len = name.len().min(8);
        n[..len].copy_from_slice(&name[..len]);

        Self { id, name: n, func }
    }
}

impl Task for FnTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn run(&mut self) -> Outcome {
        (self.func)()
    }

    fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len]).unwrap_or("?")
    }
}

impl core::fmt::Debug for FnTask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnTask")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done() -> Outcome {
        Outcome::Done
    }

    fn again() -> Outcome {
        Outcome::rerun(3)
    }

    #[test]
    fn test_fn_task_creation() {
        let task = FnTask::new(TaskId(7), b"blink", done);
        assert_eq!(task.id(), TaskId(7));
        assert_eq!(task.name(), "blink");
    }

    #[test]
    fn test_name_truncated() {
        let task = FnTask::new(TaskId(1), b"a-very-long-name", done);
        assert_eq!(task.name(), "a-very-l");
    }

    #[test]
    fn test_run_returns_outcome() {
        let mut task = FnTask::new(TaskId(2), b"again", again);
        assert_eq!(task.run(), Outcome::RerunAfter(3));
    }

    #[test]
    fn test_rerun_zero_is_immediate() {
        assert_eq!(Outcome::rerun(0), Outcome::Rerun);
        assert_eq!(Outcome::rerun(5), Outcome::RerunAfter(5));
        assert!(Outcome::Rerun.is_rerun());
        assert!(!Outcome::Done.is_rerun());
    }
}
