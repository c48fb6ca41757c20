// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Wire Codec
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Chunked binary transfers over a byte stream.
//!
//! Everything on the wire is fixed-width little-endian: `u32` for the
//! handshake row index, `f64` for grid values. The stream may deliver or
//! accept fewer bytes than requested, so both directions loop, accumulating
//! transferred counts until the full payload has moved. A zero-length
//! transfer means the peer went away; both that and an I/O error are fatal.
//! Halo state for the current iteration cannot be reconstructed from a
//! partial payload, so there are no retries.

use std::io::{self, Read, Write};

use laplace_types::error::{SolverError, SolverResult};

/// Largest single read/write handed to the underlying stream.
pub const MAX_CHUNK_BYTES: usize = 65536;

/// Write the whole payload, looping over partial writes.
pub fn send_bytes<W: Write>(stream: &mut W, payload: &[u8]) -> SolverResult<()> {
    let mut sent = 0usize;
    while sent < payload.len() {
        let end = payload.len().min(sent + MAX_CHUNK_BYTES);
        match stream.write(&payload[sent..end]) {
            Ok(0) => {
                return Err(SolverError::ConnectionLost(format!(
                    "peer stopped accepting data after {sent} of {} bytes",
                    payload.len()
                )))
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(SolverError::TransferFailure(format!(
                    "send failed after {sent} of {} bytes: {e}",
                    payload.len()
                )))
            }
        }
    }
    stream
        .flush()
        .map_err(|e| SolverError::TransferFailure(format!("flush failed: {e}")))
}

/// Fill the whole buffer, looping over partial reads.
pub fn recv_bytes<R: Read>(stream: &mut R, buf: &mut [u8]) -> SolverResult<()> {
    let mut received = 0usize;
    while received < buf.len() {
        let end = buf.len().min(received + MAX_CHUNK_BYTES);
        match stream.read(&mut buf[received..end]) {
            Ok(0) => {
                return Err(SolverError::ConnectionLost(format!(
                    "peer closed the connection after {received} of {} bytes",
                    buf.len()
                )))
            }
            Ok(n) => received += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(SolverError::TransferFailure(format!(
                    "receive failed after {received} of {} bytes: {e}",
                    buf.len()
                )))
            }
        }
    }
    Ok(())
}

pub fn send_u32<W: Write>(stream: &mut W, value: u32) -> SolverResult<()> {
    send_bytes(stream, &value.to_le_bytes())
}

pub fn recv_u32<R: Read>(stream: &mut R) -> SolverResult<u32> {
    let mut buf = [0u8; 4];
    recv_bytes(stream, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn send_f64<W: Write>(stream: &mut W, value: f64) -> SolverResult<()> {
    send_bytes(stream, &value.to_le_bytes())
}

pub fn recv_f64<R: Read>(stream: &mut R) -> SolverResult<f64> {
    let mut buf = [0u8; 8];
    recv_bytes(stream, &mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Send a row of grid values.
pub fn send_f64_row<W: Write>(stream: &mut W, row: &[f64]) -> SolverResult<()> {
    let mut payload = Vec::with_capacity(row.len() * 8);
    for v in row {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    send_bytes(stream, &payload)
}

/// Receive a row of exactly `len` grid values.
pub fn recv_f64_row<R: Read>(stream: &mut R, len: usize) -> SolverResult<Vec<f64>> {
    let mut payload = vec![0u8; len * 8];
    recv_bytes(stream, &mut payload)?;
    let mut row = Vec::with_capacity(len);
    let mut word = [0u8; 8];
    for chunk in payload.chunks_exact(8) {
        word.copy_from_slice(chunk);
        row.push(f64::from_le_bytes(word));
    }
    Ok(row)
}
