// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Shared Types
// License: MIT
// ─────────────────────────────────────────────────────────────────────
pub mod config;
pub mod error;
pub mod state;
