//! The bounded, policy-driven request queue (`spec.md` §4.1, §8 property 1).
//!
//! A ring of `RequestMeta` behind a `Mutex` + `Condvar`, exactly the
//! semaphore-pair model `spec.md` §5 describes translated to safe Rust
//! synchronization primitives. The hot counters live in a `CachePadded` the
//! way `crates/ringmpsc/src/ring.rs` cache-aligns its head/tail atomics,
//! since every `admit`/`extract` touches them.

use crate::invariants::debug_assert_queue_bounded;
use crate::ordering::OrderingTable;
use crate::protocol::Request;
use crate::timestamp::Timestamp;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

/// The request plus the three monotonic timestamps `spec.md` §3 requires.
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta {
    pub request: Request,
    pub receipt: Timestamp,
    pub start: Timestamp,
    pub completion: Timestamp,
}

impl RequestMeta {
    pub fn new(request: Request, receipt: Timestamp) -> Self {
        Self {
            request,
            receipt,
            start: Timestamp::default(),
            completion: Timestamp::default(),
        }
    }
}

/// Outcome of `admit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Rejected,
}

struct QueueInner {
    requests: Vec<Option<RequestMeta>>,
    rd: CachePadded<usize>,
    wr: CachePadded<usize>,
    available: CachePadded<usize>,
}

/// Fixed-capacity ring of admitted requests with FIFO or SJN extraction.
pub struct BoundedQueue {
    capacity: usize,
    inner: Mutex<QueueInner>,
    not_empty: Condvar,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            capacity,
            inner: Mutex::new(QueueInner {
                requests: vec![None; capacity],
                rd: CachePadded::new(0),
                wr: CachePadded::new(0),
                available: CachePadded::new(capacity),
            }),
            not_empty: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admits `req` if the queue is not full. The ordering-table append and
    /// the wake-up happen in this same critical section: `ordering.enqueue`
    /// runs before the queue lock is dropped, so a worker woken by
    /// `notify_one` can never observe the queue slot without also observing
    /// the matching ordering-table entry (`spec.md` §4.1's single atomic
    /// admission step). Never blocks.
    pub fn admit(&self, ordering: &OrderingTable, req: RequestMeta) -> Admission {
        let mut inner = self.inner.lock().unwrap();
        if *inner.available == 0 {
            return Admission::Rejected;
        }
        let img_id = req.request.img_id;
        let req_id = req.request.req_id;
        let wr = *inner.wr;
        inner.requests[wr] = Some(req);
        inner.wr = CachePadded::new((wr + 1) % self.capacity);
        let new_available = *inner.available - 1;
        inner.available = CachePadded::new(new_available);
        debug_assert_queue_bounded!(new_available, self.capacity);
        ordering.enqueue(img_id, req_id);
        drop(inner);
        self.not_empty.notify_one();
        Admission::Accepted
    }

    /// Blocks until at least one entry is available, then extracts it per
    /// `policy`. `available` is incremented exactly once per extraction.
    pub fn extract(&self, policy: crate::config::QueuePolicy) -> RequestMeta {
        let mut inner = self.inner.lock().unwrap();
        while *inner.available == self.capacity {
            inner = self.not_empty.wait(inner).unwrap();
        }
        self.extract_locked(&mut inner, policy)
    }

    /// Same as `extract`, but returns `None` if `done` becomes true while
    /// waiting and the queue is still empty. Per `spec.md` §4.4 step 2 and
    /// §9's open question: a worker that is woken by a genuine admission
    /// still consumes that item even if `done` is already set; only a
    /// worker woken purely by the shutdown wakeup with nothing queued
    /// discards nothing and exits.
    pub fn extract_or_stop(
        &self,
        policy: crate::config::QueuePolicy,
        done: &AtomicBool,
    ) -> Option<RequestMeta> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if *inner.available < self.capacity {
                return Some(self.extract_locked(&mut inner, policy));
            }
            if done.load(Ordering::SeqCst) {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    fn extract_locked(
        &self,
        inner: &mut QueueInner,
        policy: crate::config::QueuePolicy,
    ) -> RequestMeta {
        let rd = *inner.rd;
        let live = self.capacity - *inner.available;

        let picked = match policy {
            crate::config::QueuePolicy::Fifo => inner.requests[rd].take().unwrap(),
            crate::config::QueuePolicy::ShortestJobNext => {
                let mut best_idx = rd;
                let mut best_len = inner.requests[rd].unwrap().request.length.as_secs_f64();
                for step in 1..live {
                    let idx = (rd + step) % self.capacity;
                    let len = inner.requests[idx].unwrap().request.length.as_secs_f64();
                    if len < best_len {
                        best_len = len;
                        best_idx = idx;
                    }
                }
                let picked = inner.requests[best_idx].take().unwrap();
                // Shift predecessors [rd, best_idx) forward by one slot so
                // that `rd` still advances by exactly one, matching
                // `hw5_src/server_pol.c::sjn_get_from_queue`'s shift-down.
                let mut cursor = best_idx;
                while cursor != rd {
                    let prev = (cursor + self.capacity - 1) % self.capacity;
                    inner.requests[cursor] = inner.requests[prev].take();
                    cursor = prev;
                }
                picked
            }
        };

        inner.rd = CachePadded::new((rd + 1) % self.capacity);
        let new_available = *inner.available + 1;
        inner.available = CachePadded::new(new_available);
        debug_assert_queue_bounded!(new_available, self.capacity);
        picked
    }

    /// Admission-order request IDs currently queued, for the `Q:[...]` trace.
    pub fn snapshot(&self) -> Vec<u64> {
        let inner = self.inner.lock().unwrap();
        let live = self.capacity - *inner.available;
        (0..live)
            .map(|j| {
                let idx = (*inner.rd + j) % self.capacity;
                inner.requests[idx].unwrap().request.req_id
            })
            .collect()
    }

    /// Wakes every waiting consumer without requiring an admission — used by
    /// the pool controller's shutdown sequence (`spec.md` §4.5 step 5).
    pub fn wake_all(&self, count: usize) {
        for _ in 0..count {
            self.not_empty.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueuePolicy;
    use crate::protocol::OpCode;

    fn meta(req_id: u64, length_secs: u64, img_id: u64) -> RequestMeta {
        RequestMeta::new(
            Request {
                req_id,
                sent: Timestamp::default(),
                length: Timestamp { secs: length_secs, nanos: 0 },
                op: OpCode::Blur,
                overwrite: false,
                img_id,
            },
            Timestamp::default(),
        )
    }

    #[test]
    fn rejects_when_full() {
        let ordering = OrderingTable::new();
        let q = BoundedQueue::new(1);
        assert_eq!(q.admit(&ordering, meta(1, 0, 0)), Admission::Accepted);
        assert_eq!(q.admit(&ordering, meta(2, 0, 0)), Admission::Rejected);
    }

    #[test]
    fn fifo_extracts_in_admission_order() {
        let ordering = OrderingTable::new();
        let q = BoundedQueue::new(4);
        q.admit(&ordering, meta(1, 0, 0));
        q.admit(&ordering, meta(2, 0, 0));
        q.admit(&ordering, meta(3, 0, 0));
        assert_eq!(q.extract(QueuePolicy::Fifo).request.req_id, 1);
        assert_eq!(q.extract(QueuePolicy::Fifo).request.req_id, 2);
        assert_eq!(q.extract(QueuePolicy::Fifo).request.req_id, 3);
    }

    #[test]
    fn sjn_picks_shortest_then_earliest_tie() {
        let ordering = OrderingTable::new();
        let q = BoundedQueue::new(8);
        for (id, len) in [(1, 5), (2, 1), (3, 3), (4, 2), (5, 4)] {
            q.admit(&ordering, meta(id, len, id));
        }
        let order: Vec<u64> = (0..5)
            .map(|_| q.extract(QueuePolicy::ShortestJobNext).request.req_id)
            .collect();
        assert_eq!(order, vec![2, 4, 3, 5, 1]);
    }

    #[test]
    fn snapshot_reflects_live_entries_in_order() {
        let ordering = OrderingTable::new();
        let q = BoundedQueue::new(4);
        q.admit(&ordering, meta(10, 0, 0));
        q.admit(&ordering, meta(11, 0, 0));
        assert_eq!(q.snapshot(), vec![10, 11]);
        q.extract(QueuePolicy::Fifo);
        assert_eq!(q.snapshot(), vec![11]);
    }

    #[test]
    fn capacity_never_exceeded_across_random_ops() {
        let ordering = OrderingTable::new();
        let q = BoundedQueue::new(4);
        let mut admitted = 0usize;
        let mut extracted = 0usize;
        for i in 0..20u64 {
            if q.admit(&ordering, meta(i, i % 3, 0)) == Admission::Accepted {
                admitted += 1;
            }
            if admitted - extracted > 0 && i % 2 == 0 {
                q.extract(QueuePolicy::Fifo);
                extracted += 1;
            }
            assert!(admitted - extracted <= q.capacity());
        }
    }
}
