//! Task table — static slot array shared by both queues
//!
//! Every queued or running task owns exactly one slot. Slots are claimed by
//! [`TaskTable::admit`] and handed back by [`TaskTable::release`]; in between
//! the queues thread their singly-linked chains through the `link` field.
//!
//! Author: Moroya Sakamoto

use log::{debug, warn};

use crate::error::ScheduleError;
use crate::task::{Task, TaskId, Ticks};

/// Upper bound on table capacity (slot index is a `u8`)
pub const MAX_TASKS: usize = 256;

/// Capacity used by [`crate::DefaultDispatcher`]
pub const DEFAULT_TASKS: usize = 8;

/// Index of a slot in the task table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u8);

impl SlotId {
    /// Only the table mints slot ids; `idx < MAX_TASKS` by construction.
    pub(crate) const fn new(idx: usize) -> Self {
        SlotId(idx as u8)
    }

    /// Array index of this slot
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One table entry
pub(crate) struct Slot<T> {
    /// Identity of the owning task; `None` = free
    pub(crate) id: Option<TaskId>,
    /// Task body; `None` while free or while the body is running
    pub(crate) task: Option<T>,
    /// Ready: unused. Delay queue: ticks after the predecessor becomes due.
    pub(crate) delay: Ticks,
    /// Next slot in the owning queue
    pub(crate) link: Option<SlotId>,
}

impl<T> Slot<T> {
    const VACANT: Self = Self {
        id: None,
        task: None,
        delay: 0,
        link: None,
    };
}

/// Fixed-capacity task table
///
/// Size: N × (sizeof(T) + 12) bytes, no heap.
pub struct TaskTable<T, const N: usize> {
    slots: [Slot<T>; N],
}

impl<T, const N: usize> TaskTable<T, N> {
    const CAPACITY_OK: () = assert!(N >= 1 && N <= MAX_TASKS, "task table capacity must be in 1..=256");

    /// Create a table with every slot free
    pub const fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            slots: [const { Slot::<T>::VACANT }; N],
        }
    }

    /// Free every slot
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::VACANT;
        }
    }

    /// Number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of claimed slots (queued or running)
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.id.is_some()).count()
    }

    /// Slot currently claimed by `id`
    pub fn find(&self, id: TaskId) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|s| s.id == Some(id))
            .map(SlotId::new)
    }

    /// Identity occupying `slot`
    pub fn id(&self, slot: SlotId) -> Option<TaskId> {
        self.slots.get(slot.index()).and_then(|s| s.id)
    }

    /// Task body parked in `slot` (absent while it runs)
    pub fn task(&self, slot: SlotId) -> Option<&T> {
        self.slots.get(slot.index()).and_then(|s| s.task.as_ref())
    }

    /// Return `slot` to the free pool
    pub fn release(&mut self, slot: SlotId) {
        if let Some(s) = self.slots.get_mut(slot.index()) {
            debug!("release slot {} ({:?})", slot.index(), s.id);
            *s = Slot::VACANT;
        }
    }

    pub(crate) fn slot(&self, slot: SlotId) -> &Slot<T> {
        &self.slots[slot.index()]
    }

    pub(crate) fn slot_mut(&mut self, slot: SlotId) -> &mut Slot<T> {
        &mut self.slots[slot.index()]
    }

    pub(crate) fn link(&self, slot: SlotId) -> Option<SlotId> {
        self.slot(slot).link
    }

    pub(crate) fn set_link(&mut self, slot: SlotId, next: Option<SlotId>) {
        self.slot_mut(slot).link = next;
    }

    pub(crate) fn take_task(&mut self, slot: SlotId) -> Option<T> {
        self.slot_mut(slot).task.take()
    }

    pub(crate) fn put_task(&mut self, slot: SlotId, task: T) {
        self.slot_mut(slot).task = Some(task);
    }
}

impl<T: Task, const N: usize> TaskTable<T, N> {
    /// Claim the lowest free slot for `task`
    ///
    /// One pass over the table: fails with `AlreadyScheduled` if the task's
    /// identity is found anywhere, `TableFull` if no slot is free. The
    /// identity is recorded immediately; the slot is not yet linked into a
    /// queue.
    pub fn admit(&mut self, task: T) -> Result<SlotId, ScheduleError> {
        let id = task.id();
        let mut free = None;

        for (i, slot) in self.slots.iter().enumerate() {
            match slot.id {
                Some(existing) if existing == id => {
                    warn!("admit {:?} '{}': already scheduled", id, task.name());
                    return Err(ScheduleError::AlreadyScheduled);
                }
                None if free.is_none() => free = Some(i),
                _ => {}
            }
        }

        let Some(idx) = free else {
            warn!("admit {:?} '{}': table full", id, task.name());
            return Err(ScheduleError::TableFull);
        };

        debug!("admit {:?} '{}' -> slot {}", id, task.name(), idx);
        let slot = &mut self.slots[idx];
        slot.id = Some(id);
        slot.task = Some(task);
        slot.delay = 0;
        slot.link = None;
        Ok(SlotId::new(idx))
    }
}

impl<T, const N: usize> Default for TaskTable<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
