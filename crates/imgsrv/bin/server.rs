//! `imgsrv` binary: parses CLI flags, accepts exactly one connection, serves
//! it to completion, and exits.

use imgsrv::{handle_connection, ServerConfig};
use std::net::TcpListener;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match ServerConfig::parse(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(("0.0.0.0", config.port)) {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("failed to bind port {}: {e}", config.port);
            return ExitCode::FAILURE;
        }
    };

    let (stream, _addr) = match listener.accept() {
        Ok(accepted) => accepted,
        Err(e) => {
            eprintln!("failed to accept connection: {e}");
            return ExitCode::FAILURE;
        }
    };

    let writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("failed to clone socket for writing: {e}");
            return ExitCode::FAILURE;
        }
    };

    handle_connection(config, stream, writer);
    ExitCode::SUCCESS
}
