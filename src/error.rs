//! Admission errors
//!
//! Author: Moroya Sakamoto

/// Why a task was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The task's identity already occupies a slot (queued or running)
    #[error("task is already scheduled")]
    AlreadyScheduled,
    /// Every slot of the table is occupied
    #[error("task table is full")]
    TableFull,
}
