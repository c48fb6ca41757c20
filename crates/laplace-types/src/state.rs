// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Boundary Values & Grid Initialization
// License: MIT
// ─────────────────────────────────────────────────────────────────────
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Fixed Dirichlet values on the four grid edges.
///
/// Rows 0 and X-1 and columns 0 and Y-1 hold these values for the whole run
/// and are never updated by the relaxation sweep. Corner cells take the
/// top/bottom value (row precedence over column).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryValues {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for BoundaryValues {
    fn default() -> Self {
        Self {
            top: 5.0,
            bottom: -5.0,
            left: 0.0,
            right: 0.0,
        }
    }
}

impl BoundaryValues {
    /// Build the full initial grid: edges at the Dirichlet values, interior 0.
    pub fn init_grid(&self, rows: usize, cols: usize) -> Array2<f64> {
        self.init_rows(rows, cols, 0, rows)
    }

    /// Build rows `[row_start, row_end)` of the global grid, as a
    /// `(row_end - row_start) x cols` block. Lets a worker materialize its
    /// own slice (plus ghost rows) without ever holding the whole grid.
    pub fn init_rows(
        &self,
        global_rows: usize,
        cols: usize,
        row_start: usize,
        row_end: usize,
    ) -> Array2<f64> {
        Array2::from_shape_fn((row_end - row_start, cols), |(x, y)| {
            let gx = row_start + x;
            if gx == 0 {
                self.top
            } else if gx == global_rows - 1 {
                self.bottom
            } else if y == 0 {
                self.left
            } else if y == cols - 1 {
                self.right
            } else {
                0.0
            }
        })
    }

    pub fn all_finite(&self) -> bool {
        self.top.is_finite()
            && self.bottom.is_finite()
            && self.left.is_finite()
            && self.right.is_finite()
    }
}
