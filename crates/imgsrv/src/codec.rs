//! Byte-level image (de)serialization.
//!
//! Per `spec.md` §1 this is an opaque external collaborator — "treated as
//! opaque send/receive". The grammar below (a fixed header followed by raw
//! pixel bytes) is this crate's own invention since spec.md declines to
//! define one; only the fact that it is a simple length-delimited framing
//! mirrors the `recvImage`/`sendImage` call sites in
//! `examples/original_source/hw7_src/server_mimg.c`.

use crate::error::ServerError;
use crate::image::Image;
use std::io::{Read, Write};

const HEADER_LEN: usize = 4 + 4 + 1; // width, height, channels

/// Reads one length-prefixed image payload.
pub fn recv_image<R: Read>(r: &mut R) -> Result<Image, ServerError> {
    let mut header = [0u8; HEADER_LEN];
    read_exact(r, &mut header)?;
    let width = u32::from_le_bytes(header[0..4].try_into().unwrap());
    let height = u32::from_le_bytes(header[4..8].try_into().unwrap());
    let channels = header[8];

    let mut pixels = vec![0u8; width as usize * height as usize * channels as usize];
    read_exact(r, &mut pixels)?;
    Ok(Image::new(width, height, channels, pixels))
}

/// Writes one length-prefixed image payload.
pub fn send_image<W: Write>(img: &Image, w: &mut W) -> Result<(), ServerError> {
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(&img.width.to_le_bytes());
    header[4..8].copy_from_slice(&img.height.to_le_bytes());
    header[8] = img.channels;
    w.write_all(&header)
        .map_err(|e| ServerError::NetworkFailure(e.to_string()))?;
    w.write_all(&img.pixels)
        .map_err(|e| ServerError::NetworkFailure(e.to_string()))
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), ServerError> {
    r.read_exact(buf)
        .map_err(|e| ServerError::NetworkFailure(e.to_string()))
}
