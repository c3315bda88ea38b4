//! Worker state machine and pool lifecycle (`spec.md` §4.4, §4.5 step 5).
//!
//! The termination protocol — a `done` flag plus `W` wake-ups on the
//! queue's not-empty condition, then join — is carried over unchanged from
//! the homework source's `clone()`/semaphore-post/`waitpid()` sequence, just
//! expressed with `std::thread::spawn` and `JoinHandle::join` the way
//! `crates/ringmpsc-stream/src/shutdown.rs` wraps its own worker threads.

use crate::image;
use crate::protocol::{Ack, OpCode, Response};
use crate::queue::RequestMeta;
use crate::server::Server;
use crate::trace::TraceSource;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A started pool of `W` worker threads bound to one `Server`.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `server.config.workers` threads, each running the worker loop.
    pub fn start<W: Write + Send + Sync + 'static>(server: Arc<Server<W>>) -> Self {
        let handles = (0..server.config.workers)
            .map(|worker_id| {
                let server = Arc::clone(&server);
                thread::spawn(move || worker_loop(worker_id, &server))
            })
            .collect();
        Self { handles }
    }

    /// Sets the termination flag, wakes every worker that may be blocked on
    /// the queue, and joins all of them. Matches `spec.md` §4.5 step 5.
    pub fn stop<W>(self, server: &Server<W>) {
        server.done.store(true, Ordering::SeqCst);
        server.queue.wake_all(server.config.workers);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop<W: Write>(worker_id: usize, server: &Server<W>) {
    let policy = server.config.policy;
    loop {
        let item = match server.queue.extract_or_stop(policy, &server.done) {
            Some(item) => item,
            None => return,
        };
        if server.done.load(Ordering::SeqCst) {
            // Step 2: discard the extracted item and exit without processing.
            return;
        }
        process(worker_id, server, item);
    }
}

fn process<W: Write>(worker_id: usize, server: &Server<W>, mut meta: RequestMeta) {
    let req = meta.request;

    server.ordering.wait_my_turn(req.img_id, req.req_id);
    meta.start = server.now();

    let source_image = server
        .store
        .get(req.img_id)
        .expect("target image id validated at admission time");

    let (out_img_id, response_image) = if req.op == OpCode::Retrieve {
        (req.img_id, Arc::clone(&source_image))
    } else {
        let transformed = apply_op(req.op, &source_image);
        let out_img_id = server.store.publish(req.img_id, req.overwrite, transformed);
        let published = server.store.get(out_img_id).expect("just published");
        (out_img_id, published)
    };

    server.ordering.release(req.img_id, req.req_id);
    meta.completion = server.now();

    let response = Response {
        req_id: req.req_id,
        ack: Ack::Completed,
        img_id: out_img_id,
    };
    let sent = if req.op == OpCode::Retrieve {
        server.outbound.send_response_with_image(&response, &response_image)
    } else {
        server.outbound.send_response(&response)
    };
    if sent.is_err() {
        // A failed socket write aborts only this worker's response; the
        // pool and other workers continue (spec.md §4.4 failure semantics).
        return;
    }

    server.trace.op_completion(
        TraceSource::Worker(worker_id),
        req.req_id,
        req.sent,
        req.op,
        req.overwrite,
        req.img_id,
        out_img_id,
        meta.receipt,
        meta.start,
        meta.completion,
    );
    server.trace.queue_dump(&server.queue.snapshot());
}

fn apply_op(op: OpCode, img: &image::Image) -> image::Image {
    match op {
        OpCode::Rotate90Cw => image::rotate90_cw(img),
        OpCode::Blur => image::blur(img),
        OpCode::Sharpen => image::sharpen(img),
        OpCode::VertEdges => image::vertical_edges(img),
        OpCode::HorizEdges => image::horizontal_edges(img),
        OpCode::Retrieve | OpCode::Register => {
            unreachable!("registration and retrieve never reach apply_op")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QueuePolicy, ServerConfig};
    use crate::image::Image;
    use crate::queue::RequestMeta;
    use crate::timestamp::Timestamp;
    use std::sync::Mutex;

    fn test_server(queue_size: usize, workers: usize) -> Arc<Server<SharedBuf>> {
        let cfg = ServerConfig {
            queue_size,
            workers,
            policy: QueuePolicy::Fifo,
            port: 0,
        };
        Arc::new(Server::new(cfg, SharedBuf::default()))
    }

    #[derive(Default, Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);
    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn req(req_id: u64, op: OpCode, img_id: u64, overwrite: bool) -> RequestMeta {
        RequestMeta::new(
            crate::protocol::Request {
                req_id,
                sent: Timestamp::default(),
                length: Timestamp::default(),
                op,
                overwrite,
                img_id,
            },
            Timestamp::default(),
        )
    }

    #[test]
    fn worker_pool_stop_joins_idle_workers_promptly() {
        let server = test_server(4, 3);
        let pool = WorkerPool::start(Arc::clone(&server));
        pool.stop(&server);
    }

    #[test]
    fn blur_then_retrieve_through_full_pipeline() {
        let server = test_server(4, 2);
        let img_id = server.store.register(Image::new(1, 1, 1, vec![100]));
        assert_eq!(
            server
                .queue
                .admit(&server.ordering, req(1, OpCode::Blur, img_id, true)),
            crate::queue::Admission::Accepted
        );

        let pool = WorkerPool::start(Arc::clone(&server));
        // Give the worker a moment to drain the single item, then stop.
        std::thread::sleep(std::time::Duration::from_millis(50));
        pool.stop(&server);

        assert_eq!(server.store.get(img_id).unwrap().pixels, vec![100]);
    }
}
