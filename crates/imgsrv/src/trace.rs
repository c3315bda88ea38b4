//! Trace emitter and outbound socket gate (`spec.md` §4.6).
//!
//! Two independent mutexes, never one: the trace mutex guards only the
//! standard-output sink, the outbound mutex guards only the client socket,
//! so a worker dumping a trace line never blocks another worker that is
//! mid-`send`. Mirrors the dispatcher's own `sync_printf` helper in
//! `examples/original_source/hw7_src/server_mimg.c`.

use crate::error::ServerError;
use crate::image::Image;
use crate::protocol::{OpCode, Response};
use crate::timestamp::Timestamp;
use std::io::Write;
use std::sync::Mutex;

/// Worker identity for a trace line's leading `T<worker_id>` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSource {
    Worker(usize),
    /// The dispatcher itself, for registration completions — the token
    /// printed is the connection's *configured worker count*, not a thread
    /// index, matching `conn_params.workers` in `server_mimg.c`'s
    /// registration trace line.
    Dispatcher(usize),
}

impl std::fmt::Display for TraceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Worker(id) => write!(f, "{id}"),
            Self::Dispatcher(worker_count) => write!(f, "{worker_count}"),
        }
    }
}

/// Mutex-guarded, line-oriented log sink over standard output.
pub struct TraceEmitter {
    out: Mutex<()>,
}

impl TraceEmitter {
    pub fn new() -> Self {
        Self { out: Mutex::new(()) }
    }

    fn emit(&self, line: &str) {
        let _guard = self.out.lock().unwrap();
        println!("{line}");
    }

    /// `T<worker_id> R<req_id>:<sent>,<op_name>,<overwrite>,<in_img_id>,<out_img_id>,<receipt>,<start>,<completion>`
    #[allow(clippy::too_many_arguments)]
    pub fn op_completion(
        &self,
        source: TraceSource,
        req_id: u64,
        sent: Timestamp,
        op: OpCode,
        overwrite: bool,
        in_img_id: u64,
        out_img_id: u64,
        receipt: Timestamp,
        start: Timestamp,
        completion: Timestamp,
    ) {
        self.emit(&format!(
            "T{source} R{req_id}:{sent},{},{},{in_img_id},{out_img_id},{receipt},{start},{completion}",
            op.name(),
            u8::from(overwrite),
        ));
    }

    /// `Q:[R<id>,R<id>,...]`
    pub fn queue_dump(&self, req_ids: &[u64]) {
        let body = req_ids
            .iter()
            .map(|id| format!("R{id}"))
            .collect::<Vec<_>>()
            .join(",");
        self.emit(&format!("Q:[{body}]"));
    }

    /// `X<req_id>:<sent>,<length>,<receipt>`
    pub fn rejection(&self, req_id: u64, sent: Timestamp, length: Timestamp, receipt: Timestamp) {
        self.emit(&format!("X{req_id}:{sent},{length},{receipt}"));
    }
}

impl Default for TraceEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes `{send(response header); optionally send(image payload)}` over
/// one socket so a RETRIEVE payload never interleaves with another
/// worker's response header.
pub struct OutboundGate<W> {
    sink: Mutex<W>,
}

impl<W: Write> OutboundGate<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    pub fn send_response(&self, response: &Response) -> Result<(), ServerError> {
        let mut sink = self.sink.lock().unwrap();
        response.write_to(&mut *sink)
    }

    pub fn send_response_with_image(
        &self,
        response: &Response,
        image: &Image,
    ) -> Result<(), ServerError> {
        let mut sink = self.sink.lock().unwrap();
        response.write_to(&mut *sink)?;
        crate::codec::send_image(image, &mut *sink)
    }
}
