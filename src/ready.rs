//! Ready queue — FIFO of runnable slots
//!
//! Threaded through the task table's `link` field; head and tail are kept
//! here so push and pop are both O(1).
//!
//! Author: Moroya Sakamoto

use log::trace;

use crate::table::{SlotId, TaskTable};

/// FIFO of slots eligible to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadyQueue {
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl ReadyQueue {
    /// Create empty queue
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
        }
    }

    /// Append `slot` at the tail
    pub fn push<T, const N: usize>(&mut self, table: &mut TaskTable<T, N>, slot: SlotId) {
        match self.tail {
            None => self.head = Some(slot),
            Some(tail) => table.set_link(tail, Some(slot)),
        }
        table.set_link(slot, None);
        self.tail = Some(slot);
        trace!("ready <- slot {}", slot.index());
    }

    /// Remove the head slot
    pub fn pop<T, const N: usize>(&mut self, table: &mut TaskTable<T, N>) -> Option<SlotId> {
        let head = self.head?;
        self.head = table.link(head);
        if self.head.is_none() {
            self.tail = None;
        }
        table.set_link(head, None);
        trace!("ready -> slot {}", head.index());
        Some(head)
    }

    /// Head slot without removing it
    pub fn peek(&self) -> Option<SlotId> {
        self.head
    }

    /// Tail slot (most recently pushed)
    pub fn tail(&self) -> Option<SlotId> {
        self.tail
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of queued slots (walks the chain)
    pub fn len<T, const N: usize>(&self, table: &TaskTable<T, N>) -> usize {
        self.iter(table).count()
    }

    /// Slots in run order
    pub fn iter<'a, T, const N: usize>(&self, table: &'a TaskTable<T, N>) -> Iter<'a, T, N> {
        Iter {
            table,
            next: self.head,
        }
    }

    /// Forget every queued slot (the table is reset separately)
    pub fn clear(&mut self) {
        self.head = None;
        self.tail = None;
    }
}

/// Iterator over a link chain
pub struct Iter<'a, T, const N: usize> {
    table: &'a TaskTable<T, N>,
    next: Option<SlotId>,
}

impl<T, const N: usize> Iterator for Iter<'_, T, N> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        let slot = self.next?;
        self.next = self.table.link(slot);
        Some(slot)
    }
}
