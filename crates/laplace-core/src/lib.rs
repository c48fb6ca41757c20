// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Core Numerics
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Core numerics for the distributed Laplace solver: row-block partitioning,
//! the Jacobi relaxation sweep, and the single-process reference solver used
//! as correctness oracle by the distributed bindings.

pub mod partition;
pub mod reference;
pub mod relax;
