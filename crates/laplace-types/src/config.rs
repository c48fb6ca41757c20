// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Run Configuration
// License: MIT
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};
use crate::state::BoundaryValues;

/// One solver run: grid size, fixed iteration count, intra-worker thread
/// count, and the Dirichlet edge values.
///
/// Workers never negotiate these over the wire (beyond the two-peer split-row
/// handshake); every participant of a run must be handed the same config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaxConfig {
    /// Global row count X.
    pub grid_rows: usize,
    /// Global column count Y.
    pub grid_cols: usize,
    /// Fixed number of Jacobi iterations. The run never terminates early on
    /// a small residual.
    pub iterations: usize,
    /// Threads for the local sweep; 0 or 1 selects the serial sweep.
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default)]
    pub boundary: BoundaryValues,
}

fn default_threads() -> usize {
    1
}

impl Default for RelaxConfig {
    fn default() -> Self {
        Self {
            grid_rows: 64,
            grid_cols: 64,
            iterations: 1000,
            threads: 1,
            boundary: BoundaryValues::default(),
        }
    }
}

impl RelaxConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> SolverResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a well-posed run. Called
    /// before any partitioning, thread, or network activity.
    pub fn validate(&self) -> SolverResult<()> {
        if self.grid_rows < 2 || self.grid_cols < 2 {
            return Err(SolverError::ConfigError(format!(
                "grid must be at least 2x2, got {}x{}",
                self.grid_rows, self.grid_cols
            )));
        }
        if !self.boundary.all_finite() {
            return Err(SolverError::ConfigError(
                "boundary values must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
