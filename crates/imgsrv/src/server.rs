//! The per-connection `Server` value (`spec.md` §9 design note).
//!
//! The homework source keeps the queue mutex, trace mutex, outbound mutex,
//! image store, and ordering table as process-scoped globals. Per §9 this
//! is re-architected as a single value owned by the connection handler;
//! workers receive a shared `Arc<Server<W>>` instead of reaching into
//! statics, exactly the shape `crates/ringmpsc-stream/src/shutdown.rs`
//! uses for its `ShutdownHandle`/`ShutdownSignal` pair shared with worker
//! threads.

use crate::config::ServerConfig;
use crate::ordering::OrderingTable;
use crate::queue::BoundedQueue;
use crate::store::ImageStore;
use crate::trace::{OutboundGate, TraceEmitter};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

/// All state shared between the dispatcher and its worker pool for the
/// lifetime of one accepted connection.
pub struct Server<W> {
    pub config: ServerConfig,
    pub queue: BoundedQueue,
    pub store: ImageStore,
    pub ordering: OrderingTable,
    pub trace: TraceEmitter,
    pub outbound: OutboundGate<W>,
    pub epoch: Instant,
    pub done: AtomicBool,
}

impl<W: Write> Server<W> {
    pub fn new(config: ServerConfig, outbound_sink: W) -> Self {
        let queue = BoundedQueue::new(config.queue_size);
        Self {
            config,
            queue,
            store: ImageStore::new(),
            ordering: OrderingTable::new(),
            trace: TraceEmitter::new(),
            outbound: OutboundGate::new(outbound_sink),
            epoch: Instant::now(),
            done: AtomicBool::new(false),
        }
    }

    pub fn now(&self) -> crate::timestamp::Timestamp {
        crate::timestamp::Timestamp::now(&self.epoch)
    }
}
