//! Delay queue — delta-encoded list of sleeping slots
//!
//! Slots are kept in ascending order of absolute wake tick, but each node
//! stores only the ticks *after its predecessor* becomes due:
//!
//! ```text
//! due:    2      5      5      8
//! delay: [2] -> [3] -> [0] -> [3]
//! ```
//!
//! Aging the whole queue by one tick therefore touches only the head, at the
//! cost of an O(n) walk on insertion. Equal wake ticks keep insertion order
//! (the later one is linked behind with a zero delta) and are promoted on the
//! same tick.
//!
//! Author: Moroya Sakamoto

use log::trace;

use crate::ready::ReadyQueue;
use crate::table::{SlotId, TaskTable};
use crate::task::Ticks;

/// Time-ordered queue of slots waiting for a future tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelayQueue {
    head: Option<SlotId>,
}

impl DelayQueue {
    /// Create empty queue
    pub const fn new() -> Self {
        Self { head: None }
    }

    /// Link `slot` so that it becomes due `delay` ticks from now
    ///
    /// Walks the chain subtracting deltas until the remainder is smaller than
    /// the next node's delta, then links `slot` in front of that node with
    /// the remainder as its delta. Only that immediate successor is re-based
    /// (its delta shrinks by the remainder); nodes further down are measured
    /// from their own predecessors and stay untouched. At the head the
    /// remainder is the full `delay`.
    ///
    /// `delay` is expected to be non-zero; zero-delay work belongs on the
    /// ready queue.
    pub fn insert<T, const N: usize>(&mut self, table: &mut TaskTable<T, N>, slot: SlotId, delay: Ticks) {
        let mut remaining = delay;
        let mut prev: Option<SlotId> = None;
        let mut cursor = self.head;

        while let Some(node) = cursor {
            let node_delay = table.slot(node).delay;
            if remaining < node_delay {
                // node is now measured from the inserted slot
                table.slot_mut(node).delay = node_delay - remaining;
                break;
            }
            remaining -= node_delay;
            prev = Some(node);
            cursor = table.link(node);
        }

        let s = table.slot_mut(slot);
        s.delay = remaining;
        s.link = cursor;

        match prev {
            None => self.head = Some(slot),
            Some(p) => table.set_link(p, Some(slot)),
        }
        trace!("delay <- slot {} due in {} (delta {})", slot.index(), delay, remaining);
    }

    /// Age the queue by one tick, moving every slot that falls due onto the
    /// ready queue in wake order. Returns the number promoted.
    pub fn tick<T, const N: usize>(&mut self, table: &mut TaskTable<T, N>, ready: &mut ReadyQueue) -> usize {
        let Some(head) = self.head else {
            return 0;
        };
        let head_delay = &mut table.slot_mut(head).delay;
        *head_delay = head_delay.saturating_sub(1);

        let mut promoted = 0;
        while let Some(head) = self.head {
            if table.slot(head).delay != 0 {
                break;
            }
            self.head = table.link(head);
            trace!("delay -> slot {} promoted", head.index());
            ready.push(table, head);
            promoted += 1;
        }
        promoted
    }

    /// Ticks until the head falls due
    pub fn next_due<T, const N: usize>(&self, table: &TaskTable<T, N>) -> Option<Ticks> {
        self.head.map(|head| table.slot(head).delay)
    }

    /// Ticks until `slot` falls due, if it is in this queue
    pub fn due_in<T, const N: usize>(&self, table: &TaskTable<T, N>, slot: SlotId) -> Option<Ticks> {
        self.iter(table).find(|&(s, _)| s == slot).map(|(_, due)| due)
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of sleeping slots (walks the chain)
    pub fn len<T, const N: usize>(&self, table: &TaskTable<T, N>) -> usize {
        self.iter(table).count()
    }

    /// `(slot, ticks until due)` in wake order
    pub fn iter<'a, T, const N: usize>(&self, table: &'a TaskTable<T, N>) -> Iter<'a, T, N> {
        Iter {
            table,
            next: self.head,
            elapsed: 0,
        }
    }

    /// Forget every sleeping slot (the table is reset separately)
    pub fn clear(&mut self) {
        self.head = None;
    }
}

/// Iterator that rebuilds absolute due ticks from the stored deltas
pub struct Iter<'a, T, const N: usize> {
    table: &'a TaskTable<T, N>,
    next: Option<SlotId>,
    elapsed: Ticks,
}

impl<T, const N: usize> Iterator for Iter<'_, T, N> {
    type Item = (SlotId, Ticks);

    fn next(&mut self) -> Option<(SlotId, Ticks)> {
        let slot = self.next?;
        let s = self.table.slot(slot);
        self.elapsed += s.delay;
        self.next = s.link;
        Some((slot, self.elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{FnTask, Outcome, TaskId};
    use proptest::prelude::*;

    fn noop() -> Outcome {
        Outcome::Done
    }

    struct Fixture {
        table: TaskTable<FnTask, 16>,
        delayed: DelayQueue,
        ready: ReadyQueue,
        next_id: u16,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                table: TaskTable::new(),
                delayed: DelayQueue::new(),
                ready: ReadyQueue::new(),
                next_id: 0,
            }
        }

        fn claim(&mut self) -> Option<SlotId> {
            let slot = self.table.admit(FnTask::new(TaskId(self.next_id), b"d", noop)).ok()?;
            self.next_id += 1;
            Some(slot)
        }

        fn sleep(&mut self, delay: Ticks) -> SlotId {
            let slot = self.claim().unwrap();
            self.delayed.insert(&mut self.table, slot, delay);
            slot
        }

        fn tick(&mut self) -> usize {
            self.delayed.tick(&mut self.table, &mut self.ready)
        }

        fn dues(&self) -> Vec<(SlotId, Ticks)> {
            self.delayed.iter(&self.table).collect()
        }

        fn deltas(&self) -> Vec<Ticks> {
            self.delayed
                .iter(&self.table)
                .map(|(slot, _)| self.table.slot(slot).delay)
                .collect()
        }
    }

    #[test]
    fn test_insert_into_empty() {
        let mut f = Fixture::new();
        let a = f.sleep(4);
        assert_eq!(f.dues(), vec![(a, 4)]);
        assert_eq!(f.delayed.next_due(&f.table), Some(4));
    }

    #[test]
    fn test_ordering_a5_b2_c8() {
        let mut f = Fixture::new();
        let a = f.sleep(5);
        let b = f.sleep(2);
        let c = f.sleep(8);
        assert_eq!(f.dues(), vec![(b, 2), (a, 5), (c, 8)]);
        assert_eq!(f.deltas(), vec![2, 3, 3]);

        assert_eq!(f.tick(), 0);
        assert_eq!(f.tick(), 1);
        assert_eq!(f.ready.peek(), Some(b));
        f.ready.pop(&mut f.table);

        for _ in 0..2 {
            assert_eq!(f.tick(), 0);
            assert!(f.ready.is_empty());
        }
        assert_eq!(f.tick(), 1);
        assert_eq!(f.ready.pop(&mut f.table), Some(a));

        for _ in 0..2 {
            assert_eq!(f.tick(), 0);
        }
        assert_eq!(f.tick(), 1);
        assert_eq!(f.ready.pop(&mut f.table), Some(c));
        assert!(f.delayed.is_empty());
    }

    #[test]
    fn test_head_insert_keeps_later_nodes() {
        let mut f = Fixture::new();
        let b = f.sleep(2);
        let a = f.sleep(5);
        let c = f.sleep(8);
        let d = f.sleep(1);
        // only the old head is re-based; later deltas are untouched
        assert_eq!(f.dues(), vec![(d, 1), (b, 2), (a, 5), (c, 8)]);
        assert_eq!(f.deltas(), vec![1, 1, 3, 3]);
    }

    #[test]
    fn test_middle_insert() {
        let mut f = Fixture::new();
        let a = f.sleep(2);
        let c = f.sleep(9);
        let b = f.sleep(6);
        assert_eq!(f.dues(), vec![(a, 2), (b, 6), (c, 9)]);
        assert_eq!(f.deltas(), vec![2, 4, 3]);
    }

    #[test]
    fn test_equal_due_ties_keep_insertion_order() {
        let mut f = Fixture::new();
        let a = f.sleep(3);
        let b = f.sleep(3);
        let c = f.sleep(3);
        assert_eq!(f.deltas(), vec![3, 0, 0]);

        f.tick();
        f.tick();
        assert_eq!(f.tick(), 3);
        assert_eq!(f.ready.iter(&f.table).collect::<Vec<_>>(), vec![a, b, c]);
    }

    #[test]
    fn test_tie_with_middle_boundary() {
        let mut f = Fixture::new();
        let a = f.sleep(2);
        let b = f.sleep(5);
        let x = f.sleep(2);
        let y = f.sleep(5);
        assert_eq!(f.dues(), vec![(a, 2), (x, 2), (b, 5), (y, 5)]);
    }

    #[test]
    fn test_insert_after_aging() {
        let mut f = Fixture::new();
        let a = f.sleep(5);
        f.tick();
        f.tick();
        let b = f.sleep(2);
        assert_eq!(f.dues(), vec![(b, 2), (a, 3)]);
        f.tick();
        assert_eq!(f.tick(), 1);
        assert_eq!(f.ready.peek(), Some(b));
    }

    #[test]
    fn test_tick_empty() {
        let mut f = Fixture::new();
        assert_eq!(f.tick(), 0);
        assert_eq!(f.delayed.next_due(&f.table), None);
    }

    #[test]
    fn test_due_in() {
        let mut f = Fixture::new();
        let a = f.sleep(4);
        let b = f.sleep(7);
        f.tick();
        assert_eq!(f.delayed.due_in(&f.table, a), Some(3));
        assert_eq!(f.delayed.due_in(&f.table, b), Some(6));
        let stranger = f.claim().unwrap();
        assert_eq!(f.delayed.due_in(&f.table, stranger), None);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(Ticks),
        Tick,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![(1u32..12).prop_map(Op::Insert), Just(Op::Tick)]
    }

    proptest! {
        /// Deltas summed from the head always equal requested wake ticks
        /// minus elapsed ticks, ties included.
        #[test]
        fn prop_deltas_match_absolute_due(ops in prop::collection::vec(op(), 1..80)) {
            let mut f = Fixture::new();
            let mut model: Vec<(SlotId, Ticks)> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(delay) => {
                        let Some(slot) = f.claim() else { continue };
                        f.delayed.insert(&mut f.table, slot, delay);
                        let pos = model.iter().position(|&(_, due)| due > delay).unwrap_or(model.len());
                        model.insert(pos, (slot, delay));
                    }
                    Op::Tick => {
                        let promoted = f.tick();
                        for entry in model.iter_mut() {
                            entry.1 -= 1;
                        }
                        let due_now: Vec<SlotId> = model.iter().filter(|e| e.1 == 0).map(|e| e.0).collect();
                        model.retain(|e| e.1 > 0);

                        prop_assert_eq!(promoted, due_now.len());
                        for expected in due_now {
                            prop_assert_eq!(f.ready.pop(&mut f.table), Some(expected));
                            f.table.release(expected);
                        }
                    }
                }
                prop_assert_eq!(f.dues(), model.clone());
            }
        }
    }
}
