//! Monotonic timestamps, stamped relative to a per-connection epoch.
//!
//! Mirrors `CLOCK_MONOTONIC` / `struct timespec` from the homework source:
//! plain `(seconds, nanoseconds)` pairs so the rest of the crate never has to
//! reason about wall-clock skew, only elapsed time since the connection was
//! accepted.

use std::fmt;
use std::time::Instant;

/// A monotonic instant expressed as whole seconds plus a nanosecond remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub secs: u64,
    pub nanos: u32,
}

impl Timestamp {
    /// Stamps "now", relative to `epoch`.
    pub fn now(epoch: &Instant) -> Self {
        let elapsed = epoch.elapsed();
        Self {
            secs: elapsed.as_secs(),
            nanos: elapsed.subsec_nanos(),
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + f64::from(self.nanos) / 1_000_000_000.0
    }

    pub fn to_le_bytes(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[..8].copy_from_slice(&self.secs.to_le_bytes());
        out[8..].copy_from_slice(&self.nanos.to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: [u8; 12]) -> Self {
        let mut secs_bytes = [0u8; 8];
        secs_bytes.copy_from_slice(&bytes[..8]);
        let mut nanos_bytes = [0u8; 4];
        nanos_bytes.copy_from_slice(&bytes[8..]);
        Self {
            secs: u64::from_le_bytes(secs_bytes),
            nanos: u32::from_le_bytes(nanos_bytes),
        }
    }
}

/// Decimal seconds with exactly six fractional digits, per the trace format.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.as_secs_f64())
    }
}
