//! Wire protocol: fixed little-endian request/response headers.
//!
//! Layouts follow `spec.md` §3 and §6, grounded on the field order used by
//! `examples/original_source/hw7_src/server_mimg.c`'s `struct request` /
//! `struct response`.

use crate::error::ServerError;
use crate::timestamp::Timestamp;
use std::io::{Read, Write};

/// Operation carried by a request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Register,
    Rotate90Cw,
    Blur,
    Sharpen,
    VertEdges,
    HorizEdges,
    Retrieve,
}

impl OpCode {
    fn from_u8(byte: u8) -> Result<Self, ServerError> {
        match byte {
            0 => Ok(Self::Register),
            1 => Ok(Self::Rotate90Cw),
            2 => Ok(Self::Blur),
            3 => Ok(Self::Sharpen),
            4 => Ok(Self::VertEdges),
            5 => Ok(Self::HorizEdges),
            6 => Ok(Self::Retrieve),
            other => Err(ServerError::InvalidOp(other)),
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Register => 0,
            Self::Rotate90Cw => 1,
            Self::Blur => 2,
            Self::Sharpen => 3,
            Self::VertEdges => 4,
            Self::HorizEdges => 5,
            Self::Retrieve => 6,
        }
    }

    /// Uppercase trace token, matching `OPCODE_TO_STRING` in the original.
    pub fn name(self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::Rotate90Cw => "ROTATE90CW",
            Self::Blur => "BLUR",
            Self::Sharpen => "SHARPEN",
            Self::VertEdges => "VERT_EDGES",
            Self::HorizEdges => "HORIZ_EDGES",
            Self::Retrieve => "RETRIEVE",
        }
    }
}

/// Inbound request header (fixed 38-byte layout: 8 + 12 + 12 + 1 + 1 + 8 - 4
/// padding, see `to_le_bytes`/`from_le_bytes` for the exact byte grammar).
#[derive(Debug, Clone, Copy)]
pub struct Request {
    pub req_id: u64,
    pub sent: Timestamp,
    pub length: Timestamp,
    pub op: OpCode,
    pub overwrite: bool,
    pub img_id: u64,
}

pub const REQUEST_WIRE_LEN: usize = 8 + 12 + 12 + 1 + 1 + 8;

impl Request {
    pub fn to_le_bytes(&self) -> [u8; REQUEST_WIRE_LEN] {
        let mut out = [0u8; REQUEST_WIRE_LEN];
        let mut at = 0;
        out[at..at + 8].copy_from_slice(&self.req_id.to_le_bytes());
        at += 8;
        out[at..at + 12].copy_from_slice(&self.sent.to_le_bytes());
        at += 12;
        out[at..at + 12].copy_from_slice(&self.length.to_le_bytes());
        at += 12;
        out[at] = self.op.to_u8();
        at += 1;
        out[at] = u8::from(self.overwrite);
        at += 1;
        out[at..at + 8].copy_from_slice(&self.img_id.to_le_bytes());
        out
    }

    fn from_le_bytes(bytes: [u8; REQUEST_WIRE_LEN]) -> Result<Self, ServerError> {
        let mut at = 0;
        let req_id = u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap());
        at += 8;
        let mut sent_bytes = [0u8; 12];
        sent_bytes.copy_from_slice(&bytes[at..at + 12]);
        let sent = Timestamp::from_le_bytes(sent_bytes);
        at += 12;
        let mut length_bytes = [0u8; 12];
        length_bytes.copy_from_slice(&bytes[at..at + 12]);
        let length = Timestamp::from_le_bytes(length_bytes);
        at += 12;
        let op = OpCode::from_u8(bytes[at])?;
        at += 1;
        let overwrite = bytes[at] != 0;
        at += 1;
        let img_id = u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap());
        Ok(Self {
            req_id,
            sent,
            length,
            op,
            overwrite,
            img_id,
        })
    }

    /// Reads one header. Returns `Ok(None)` on a clean EOF (zero bytes read
    /// before any header byte arrives), `Err(NetworkFailure)` on a short read
    /// or I/O error, and propagates `InvalidOp` for an unrecognized opcode.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Option<Self>, ServerError> {
        let mut buf = [0u8; REQUEST_WIRE_LEN];
        let mut filled = 0;
        loop {
            match r.read(&mut buf[filled..]) {
                Ok(0) => {
                    if filled == 0 {
                        return Ok(None);
                    }
                    return Err(ServerError::NetworkFailure(
                        "connection closed mid-header".into(),
                    ));
                }
                Ok(n) => {
                    filled += n;
                    if filled == REQUEST_WIRE_LEN {
                        return Self::from_le_bytes(buf).map(Some);
                    }
                }
                Err(e) => return Err(ServerError::NetworkFailure(e.to_string())),
            }
        }
    }
}

/// Outbound acknowledgement code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Completed,
    Rejected,
}

/// Outbound response header.
#[derive(Debug, Clone, Copy)]
pub struct Response {
    pub req_id: u64,
    pub ack: Ack,
    pub img_id: u64,
}

pub const RESPONSE_WIRE_LEN: usize = 8 + 1 + 8;

impl Response {
    pub fn to_le_bytes(&self) -> [u8; RESPONSE_WIRE_LEN] {
        let mut out = [0u8; RESPONSE_WIRE_LEN];
        out[..8].copy_from_slice(&self.req_id.to_le_bytes());
        out[8] = match self.ack {
            Ack::Completed => 0,
            Ack::Rejected => 1,
        };
        out[9..].copy_from_slice(&self.img_id.to_le_bytes());
        out
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), ServerError> {
        w.write_all(&self.to_le_bytes())
            .map_err(|e| ServerError::NetworkFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn request_round_trips() {
        let req = Request {
            req_id: 7,
            sent: Timestamp { secs: 1, nanos: 2 },
            length: Timestamp { secs: 3, nanos: 4 },
            op: OpCode::Blur,
            overwrite: true,
            img_id: 9,
        };
        let bytes = req.to_le_bytes();
        let mut cursor = Cursor::new(bytes.to_vec());
        let parsed = Request::read_from(&mut cursor).unwrap().unwrap();
        assert_eq!(parsed.req_id, 7);
        assert_eq!(parsed.op, OpCode::Blur);
        assert!(parsed.overwrite);
        assert_eq!(parsed.img_id, 9);
    }

    #[test]
    fn clean_eof_returns_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(Request::read_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn unknown_opcode_is_invalid_op() {
        let mut bytes = Request {
            req_id: 1,
            sent: Timestamp::default(),
            length: Timestamp::default(),
            op: OpCode::Register,
            overwrite: false,
            img_id: 0,
        }
        .to_le_bytes();
        bytes[8 + 12 + 12] = 200;
        let mut cursor = Cursor::new(bytes.to_vec());
        let err = Request::read_from(&mut cursor).unwrap_err();
        assert!(matches!(err, ServerError::InvalidOp(200)));
    }

    #[test]
    fn opcode_names_match_trace_tokens() {
        assert_eq!(OpCode::Rotate90Cw.name(), "ROTATE90CW");
        assert_eq!(OpCode::VertEdges.name(), "VERT_EDGES");
        assert_eq!(OpCode::HorizEdges.name(), "HORIZ_EDGES");
    }
}
