//! Single-client, bounded-queue image processing request server.
//!
//! See [`dispatcher::handle_connection`] for the entry point used by the
//! `imgsrv` binary.

pub mod codec;
mod config;
mod dispatcher;
mod error;
pub mod image;
mod invariants;
mod ordering;
pub mod protocol;
mod queue;
mod server;
mod store;
pub mod timestamp;
mod trace;
mod worker;

pub use config::{QueuePolicy, ServerConfig};
pub use dispatcher::handle_connection;
pub use error::ServerError;
