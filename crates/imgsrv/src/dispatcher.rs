//! Connection handler (`spec.md` §4.5).
//!
//! One call to `handle_connection` covers a whole accepted connection: it
//! builds the queue and pool, runs the read loop, and tears the pool down
//! on EOF or a terminal I/O error. Mirrors `server_mimg.c`'s
//! `handle_connection` but the `Server<W>` value replaces its process-wide
//! globals (`spec.md` §9).

use crate::codec;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::{Ack, OpCode, Request, Response};
use crate::queue::{Admission, RequestMeta};
use crate::server::Server;
use crate::store::ImageStore;
use crate::worker::WorkerPool;
use std::io::{Read, Write};
use std::sync::Arc;

/// Serves one connection to completion. `reader` and `writer` are
/// independent halves of the same socket (e.g. two `TcpStream` handles from
/// `try_clone`), matching the homework's single full-duplex fd used for
/// both directions.
pub fn handle_connection<R: Read, W: Write + Send + Sync + 'static>(
    config: ServerConfig,
    mut reader: R,
    writer: W,
) {
    let server = Arc::new(Server::new(config, writer));
    let pool = WorkerPool::start(Arc::clone(&server));

    loop {
        let receipt = server.now();
        match Request::read_from(&mut reader) {
            Ok(None) => break,
            Ok(Some(req)) => {
                let ok = if req.op == OpCode::Register {
                    handle_registration(&server, &mut reader, req, receipt)
                } else {
                    handle_admission(&server, req, receipt)
                };
                if !ok {
                    break;
                }
            }
            Err(e) if e.is_terminal() => {
                eprintln!("connection terminated: {e}");
                break;
            }
            Err(e) => {
                eprintln!("dropping malformed request: {e}");
            }
        }
    }

    pool.stop(&server);
}

/// Registers the image read from `reader`. Returns `false` when a
/// `NetworkFailure` on either the image-payload read or the response write
/// leaves the stream desynchronized; per `spec.md` §7 a `NetworkFailure`
/// terminates the connection handler, so the caller must stop admitting and
/// close the socket rather than parse the next header against a
/// mid-payload stream.
fn handle_registration<R: Read, W: Write + Send + Sync + 'static>(
    server: &Arc<Server<W>>,
    reader: &mut R,
    req: Request,
    receipt: crate::timestamp::Timestamp,
) -> bool {
    let start = server.now();
    let new_id = match register_from_socket(reader, &server.store) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("registration failed, terminating connection: {e}");
            return false;
        }
    };
    let completion = server.now();

    let response = Response {
        req_id: req.req_id,
        ack: Ack::Completed,
        img_id: new_id,
    };
    if server.outbound.send_response(&response).is_err() {
        eprintln!("registration response write failed, terminating connection");
        return false;
    }

    server.trace.op_completion(
        crate::trace::TraceSource::Dispatcher(server.config.workers),
        req.req_id,
        req.sent,
        OpCode::Register,
        req.overwrite,
        req.img_id,
        new_id,
        receipt,
        start,
        completion,
    );
    server.trace.queue_dump(&server.queue.snapshot());
    true
}

fn register_from_socket<R: Read>(reader: &mut R, store: &ImageStore) -> Result<u64, ServerError> {
    let image = codec::recv_image(reader)?;
    Ok(store.register(image))
}

/// Admits or rejects `req`. Returns `false` on a `NetworkFailure` writing the
/// rejection response, per the same termination rule `handle_registration`
/// follows.
fn handle_admission<W: Write + Send + Sync + 'static>(
    server: &Arc<Server<W>>,
    req: Request,
    receipt: crate::timestamp::Timestamp,
) -> bool {
    if req.img_id as usize >= server.store.len() {
        return reject(server, req, receipt);
    }

    let meta = RequestMeta::new(req, receipt);
    if server.queue.admit(&server.ordering, meta) == Admission::Rejected {
        return reject(server, req, receipt);
    }
    true
}

fn reject<W: Write + Send + Sync + 'static>(
    server: &Arc<Server<W>>,
    req: Request,
    receipt: crate::timestamp::Timestamp,
) -> bool {
    let response = Response {
        req_id: req.req_id,
        ack: Ack::Rejected,
        img_id: req.img_id,
    };
    if server.outbound.send_response(&response).is_err() {
        eprintln!("rejection response write failed, terminating connection");
        return false;
    }
    server.trace.rejection(req.req_id, req.sent, req.length, receipt);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueuePolicy;
    use crate::image::Image;
    use crate::protocol::OpCode;
    use std::io::Cursor;
    use std::sync::Mutex;

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

    fn cfg(queue_size: usize, workers: usize) -> ServerConfig {
        ServerConfig {
            queue_size,
            workers,
            policy: QueuePolicy::Fifo,
            port: 0,
        }
    }

    fn register_request(req_id: u64) -> Request {
        Request {
            req_id,
            sent: Default::default(),
            length: Default::default(),
            op: OpCode::Register,
            overwrite: false,
            img_id: 0,
        }
    }

    #[test]
    fn register_then_eof_produces_one_response() {
        let image = Image::new(1, 1, 1, vec![42]);
        let mut payload = Vec::new();
        codec::send_image(&image, &mut payload).unwrap();

        let mut input = register_request(1).to_le_bytes().to_vec();
        input.extend_from_slice(&payload);
        let mut reader = Cursor::new(input);
        let writer = SharedBuf::default();

        handle_connection(cfg(2, 1), &mut reader, writer.clone());

        let out = writer.0.lock().unwrap();
        assert_eq!(out.len(), crate::protocol::RESPONSE_WIRE_LEN);
    }

    #[test]
    fn admission_against_unknown_image_is_rejected() {
        let req = Request {
            req_id: 1,
            sent: Default::default(),
            length: Default::default(),
            op: OpCode::Blur,
            overwrite: false,
            img_id: 99,
        };
        let mut reader = Cursor::new(req.to_le_bytes().to_vec());
        let writer = SharedBuf::default();

        handle_connection(cfg(2, 1), &mut reader, writer.clone());

        let out = writer.0.lock().unwrap();
        assert_eq!(out.len(), crate::protocol::RESPONSE_WIRE_LEN);
        assert_eq!(out[8], 1); // Ack::Rejected
    }
}
