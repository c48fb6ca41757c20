// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Error Taxonomy
// License: MIT
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

/// Failure taxonomy for the solver.
///
/// `InvalidTopology` is always raised before any thread or network activity,
/// so it signals a configuration problem the caller can fix. `TransferFailure`
/// and `ConnectionLost` mean the run died mid-flight: halo state for the
/// current iteration is unrecoverable and the run must be repeated, never
/// resumed.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("transfer failed: {0}")]
    TransferFailure(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
