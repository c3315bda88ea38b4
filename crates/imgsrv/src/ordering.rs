//! The per-image ordering table / turn gate (`spec.md` §4.2, §4.3).
//!
//! One shared `Condvar` rather than one per image: `std::sync::Condvar` has
//! no keyed/per-entry variant, and standing up a dedicated `Condvar` per
//! image ID would mean growing that pool exactly as dynamically as the
//! image store itself, for no observable benefit — every waiter re-checks
//! its own predicate (its image's head) after each wake, so a broadcast
//! `notify_all` on every `release` is both correct and simple, in the same
//! spirit as the teacher's preference for one coarse `Condvar` over
//! per-entry primitives in `crates/ringmpsc-stream/src/shutdown.rs`.

use crate::invariants::{debug_assert_ordering_matches_admission, debug_assert_released};
use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex};

/// Per-image FIFO sequences of outstanding request IDs.
pub struct OrderingTable {
    queues: Mutex<HashMap<u64, VecDeque<u64>>>,
    turn_taken: Condvar,
}

impl OrderingTable {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            turn_taken: Condvar::new(),
        }
    }

    /// Appends `req_id` to the tail of `img_id`'s sequence. Called by the
    /// queue's `admit` step, in the same critical section as the admission.
    pub fn enqueue(&self, img_id: u64, req_id: u64) {
        let mut queues = self.queues.lock().unwrap();
        let seq = queues.entry(img_id).or_default();
        seq.push_back(req_id);
        debug_assert_ordering_matches_admission!(*seq.back().unwrap(), req_id);
    }

    /// Blocks until `req_id` is at the head of `img_id`'s sequence.
    pub fn wait_my_turn(&self, img_id: u64, req_id: u64) {
        let mut queues = self.queues.lock().unwrap();
        loop {
            let at_head = queues
                .get(&img_id)
                .and_then(|seq| seq.front())
                .is_some_and(|front| *front == req_id);
            if at_head {
                return;
            }
            queues = self.turn_taken.wait(queues).unwrap();
        }
    }

    /// Removes the head of `img_id`'s sequence if it equals `req_id`, then
    /// wakes every waiter so the next-in-line worker can re-check. Idempotent
    /// with respect to an absent or already-removed ID — a defensive no-op.
    pub fn release(&self, img_id: u64, req_id: u64) {
        let mut queues = self.queues.lock().unwrap();
        if let Some(seq) = queues.get_mut(&img_id) {
            if seq.front() == Some(&req_id) {
                seq.pop_front();
            }
        }
        let new_front = queues.get(&img_id).and_then(|seq| seq.front()).copied();
        debug_assert_released!(new_front, req_id);
        drop(queues);
        self.turn_taken.notify_all();
    }
}

impl Default for OrderingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn single_waiter_proceeds_immediately_when_at_head() {
        let table = OrderingTable::new();
        table.enqueue(0, 1);
        table.wait_my_turn(0, 1);
    }

    #[test]
    fn release_is_idempotent_for_absent_id() {
        let table = OrderingTable::new();
        table.release(0, 999);
    }

    #[test]
    fn second_waiter_blocks_until_first_releases() {
        let table = Arc::new(OrderingTable::new());
        table.enqueue(0, 1);
        table.enqueue(0, 2);

        let observed = Arc::new(Mutex::new(false));
        let table2 = Arc::clone(&table);
        let observed2 = Arc::clone(&observed);
        let handle = thread::spawn(move || {
            table2.wait_my_turn(0, 2);
            *observed2.lock().unwrap() = true;
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!*observed.lock().unwrap());

        table.release(0, 1);
        handle.join().unwrap();
        assert!(*observed.lock().unwrap());
    }

    #[test]
    fn release_advances_to_next_distinct_image_independently() {
        let table = OrderingTable::new();
        table.enqueue(0, 1);
        table.enqueue(1, 2);
        // Different images: both at their own head immediately.
        table.wait_my_turn(0, 1);
        table.wait_my_turn(1, 2);
    }
}
