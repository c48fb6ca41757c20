// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Two-Peer Binding
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Point-to-point halo exchange between exactly two peers over a byte
//! stream.
//!
//! The primary peer owns the lower half of the grid (rows `[X/2, X)`) and
//! reports the combined result; the secondary owns `[0, X/2)`. Connection
//! bootstrap is the caller's problem; this module is handed an
//! already-connected stream.
//!
//! Wire protocol, in order:
//! 1. handshake: primary sends the split row index as one `u32`;
//! 2. per iteration, both directions: one boundary row of Y `f64` values;
//! 3. teardown: secondary sends one `f64`, its last-iteration local max.
//!
//! The convergence scalar crosses the wire exactly once, after all
//! iterations. This is deliberately weaker than the per-iteration reduction
//! of the chain binding and must not be "fixed" to match it.

use std::io::{Read, Write};

use laplace_types::error::{SolverError, SolverResult};

use crate::wire;

/// Which side of the two-peer split this worker is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRole {
    /// Owns rows `[X/2, X)`; sends the handshake, receives the final scalar.
    Primary,
    /// Owns rows `[0, X/2)`; checks the handshake, sends the final scalar.
    Secondary,
}

impl PairRole {
    pub fn rank(self) -> usize {
        match self {
            PairRole::Secondary => 0,
            PairRole::Primary => 1,
        }
    }
}

/// One full-duplex link to the other peer.
pub struct PairLink<S> {
    stream: S,
    role: PairRole,
}

impl<S: Read + Write> PairLink<S> {
    pub fn new(stream: S, role: PairRole) -> Self {
        Self { stream, role }
    }

    pub fn role(&self) -> PairRole {
        self.role
    }

    /// One-time setup: the primary announces the split row; the secondary
    /// cross-checks it against its own partition of the same config.
    pub fn handshake(&mut self, split_row: u32) -> SolverResult<u32> {
        match self.role {
            PairRole::Primary => {
                wire::send_u32(&mut self.stream, split_row)?;
                Ok(split_row)
            }
            PairRole::Secondary => {
                let announced = wire::recv_u32(&mut self.stream)?;
                if announced != split_row {
                    return Err(SolverError::TransferFailure(format!(
                        "handshake split row mismatch: peer announced {announced}, \
                         this side expects {split_row}"
                    )));
                }
                Ok(announced)
            }
        }
    }

    /// Full-duplex boundary row swap. Both peers send before blocking on the
    /// receive of the same size, so neither direction waits on the other.
    pub fn exchange_row(&mut self, outgoing: &[f64]) -> SolverResult<Vec<f64>> {
        wire::send_f64_row(&mut self.stream, outgoing)?;
        wire::recv_f64_row(&mut self.stream, outgoing.len())
    }

    /// Teardown: move the secondary's final local max to the primary.
    /// Returns the peer's scalar on the primary, `None` on the secondary.
    pub fn finish(&mut self, local_max: f64) -> SolverResult<Option<f64>> {
        match self.role {
            PairRole::Secondary => {
                wire::send_f64(&mut self.stream, local_max)?;
                Ok(None)
            }
            PairRole::Primary => Ok(Some(wire::recv_f64(&mut self.stream)?)),
        }
    }
}
