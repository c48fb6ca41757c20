// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Distributed Bindings
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Distribution layer for the Jacobi solver.
//!
//! Two transport bindings share one contract (exchange exactly one boundary
//! row per neighbor per iteration, abort on any partial transfer):
//!
//! - [`pair`]: two peers over a byte stream (`Read + Write`), with a
//!   split-row handshake and a single final convergence scalar.
//! - [`collective`]: an N-worker chain over per-direction message channels,
//!   with scatter/gather rooted at rank 0 and a per-iteration max-reduction.
//!
//! [`controller`] drives the per-worker iteration sequence for both bindings;
//! [`wire`] is the chunked binary codec of the two-peer binding.

pub mod aggregate;
pub mod collective;
pub mod controller;
pub mod pair;
pub mod wire;
