// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Single-Process Reference Solver
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Whole-grid Jacobi relaxation in a single process.
//!
//! The distributed bindings must reproduce this solver cell-for-cell; the
//! equivalence suites use it as the oracle. Returns the last iteration's
//! maximum change, matching what the distributed runs report.

use ndarray::Array2;

use laplace_types::config::RelaxConfig;
use laplace_types::error::{SolverError, SolverResult};

use crate::relax::relax_rows;

/// Run `iterations` Jacobi sweeps over the full grid in place.
pub fn solve_serial(grid: &mut Array2<f64>, iterations: usize) -> SolverResult<f64> {
    let rows = grid.nrows();
    if rows < 2 || grid.ncols() < 2 {
        return Err(SolverError::InvalidTopology(format!(
            "reference solve needs at least a 2x2 grid, got {:?}",
            grid.dim()
        )));
    }
    let mut snapshot = grid.clone();
    let mut max_change = 0.0;
    for _ in 0..iterations {
        snapshot.assign(grid);
        max_change = relax_rows(grid, &snapshot, 1..rows - 1)?;
    }
    Ok(max_change)
}

/// Convenience: initialize from the config's boundary values and solve.
pub fn solve_config(cfg: &RelaxConfig) -> SolverResult<(Array2<f64>, f64)> {
    cfg.validate()?;
    let mut grid = cfg.boundary.init_grid(cfg.grid_rows, cfg.grid_cols);
    let max_change = solve_serial(&mut grid, cfg.iterations)?;
    Ok((grid, max_change))
}
