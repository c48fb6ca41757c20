// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Jacobi Sweep
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! One Jacobi relaxation sweep over a block of rows.
//!
//! The sweep reads exclusively from `uu`, the snapshot of the previous
//! iteration, and writes exclusively to `u`. This is the central correctness
//! invariant: no cell update may observe a value already updated in the same
//! iteration. The caller stages any halo rows into `uu` before the sweep;
//! the sweep itself performs no I/O.

use std::ops::Range;

use ndarray::parallel::prelude::*;
use ndarray::{s, Array2, Axis};

use laplace_types::error::{SolverError, SolverResult};

/// Serial 5-point sweep over local rows `rows`, columns `1..Y-1`.
///
/// Returns the maximum absolute change across the swept cells. `rows` is in
/// local (buffer) indexing and must leave the first and last buffer row
/// untouched; those are either Dirichlet rows or ghost rows.
pub fn relax_rows(u: &mut Array2<f64>, uu: &Array2<f64>, rows: Range<usize>) -> SolverResult<f64> {
    check_sweep(u, uu, &rows)?;
    let cols = uu.ncols();
    if cols < 3 {
        return Ok(0.0);
    }
    let mut max_change = 0.0f64;
    for x in rows {
        for y in 1..cols - 1 {
            let fresh = 0.25 * (uu[[x - 1, y]] + uu[[x + 1, y]] + uu[[x, y - 1]] + uu[[x, y + 1]]);
            let diff = (fresh - uu[[x, y]]).abs();
            if diff > max_change {
                max_change = diff;
            }
            u[[x, y]] = fresh;
        }
    }
    Ok(max_change)
}

/// Rayon-parallel variant of [`relax_rows`].
///
/// Rows are independent given the `uu` snapshot, so the sweep parallelizes
/// over rows with a `f64::max` reduction. The reduction result does not
/// depend on scheduling order.
pub fn relax_rows_parallel(
    u: &mut Array2<f64>,
    uu: &Array2<f64>,
    rows: Range<usize>,
) -> SolverResult<f64> {
    check_sweep(u, uu, &rows)?;
    let cols = uu.ncols();
    if cols < 3 {
        return Ok(0.0);
    }
    let start = rows.start;
    let max_change = u
        .slice_mut(s![rows, ..])
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(k, mut row)| {
            let x = start + k;
            let above = uu.row(x - 1);
            let below = uu.row(x + 1);
            let prev = uu.row(x);
            let mut row_max = 0.0f64;
            for y in 1..cols - 1 {
                let fresh = 0.25 * (above[y] + below[y] + prev[y - 1] + prev[y + 1]);
                let diff = (fresh - prev[y]).abs();
                if diff > row_max {
                    row_max = diff;
                }
                row[y] = fresh;
            }
            row_max
        })
        .reduce(|| 0.0, f64::max);
    Ok(max_change)
}

fn check_sweep(u: &Array2<f64>, uu: &Array2<f64>, rows: &Range<usize>) -> SolverResult<()> {
    if u.dim() != uu.dim() {
        return Err(SolverError::ConfigError(format!(
            "sweep buffer shapes differ: {:?} vs {:?}",
            u.dim(),
            uu.dim()
        )));
    }
    if rows.is_empty() {
        return Ok(());
    }
    if rows.start == 0 || rows.end > u.nrows().saturating_sub(1) {
        return Err(SolverError::InvalidTopology(format!(
            "sweep row range {}..{} touches a fixed or ghost row of a {}-row buffer",
            rows.start,
            rows.end,
            u.nrows()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(u: &Array2<f64>) -> Array2<f64> {
        u.clone()
    }

    /// Jacobi isolation: the sweep must read only the snapshot, even when
    /// `u` has been scribbled over before the call.
    #[test]
    fn test_sweep_reads_snapshot_only() {
        let uu = Array2::from_shape_fn((4, 4), |(x, y)| (x * 4 + y) as f64);
        // u deliberately disagrees with uu everywhere.
        let mut u = Array2::from_elem((4, 4), 999.0);

        let max_change = relax_rows(&mut u, &uu, 1..3).expect("sweep");

        for x in 1..3 {
            for y in 1..3 {
                let expected =
                    0.25 * (uu[[x - 1, y]] + uu[[x + 1, y]] + uu[[x, y - 1]] + uu[[x, y + 1]]);
                assert_eq!(u[[x, y]], expected, "cell ({x},{y})");
            }
        }
        // Columns 0 and 3 untouched.
        for x in 0..4 {
            assert_eq!(u[[x, 0]], 999.0);
            assert_eq!(u[[x, 3]], 999.0);
        }
        // Max change is measured against the snapshot, not against u.
        let expected_max = (1..3)
            .flat_map(|x| (1..3).map(move |y| (x, y)))
            .map(|(x, y)| {
                let fresh =
                    0.25 * (uu[[x - 1, y]] + uu[[x + 1, y]] + uu[[x, y - 1]] + uu[[x, y + 1]]);
                (fresh - uu[[x, y]]).abs()
            })
            .fold(0.0f64, f64::max);
        assert_eq!(max_change, expected_max);
    }

    #[test]
    fn test_parallel_matches_serial_exactly() {
        let uu = Array2::from_shape_fn((16, 9), |(x, y)| ((x * 31 + y * 7) % 13) as f64 - 6.0);
        let mut u_serial = snapshot(&uu);
        let mut u_par = snapshot(&uu);

        let m1 = relax_rows(&mut u_serial, &uu, 1..15).expect("serial");
        let m2 = relax_rows_parallel(&mut u_par, &uu, 1..15).expect("parallel");

        assert_eq!(m1, m2);
        assert_eq!(u_serial, u_par);
    }

    #[test]
    fn test_empty_range_is_a_noop() {
        let uu = Array2::ones((4, 4));
        let mut u = uu.clone();
        let m = relax_rows(&mut u, &uu, 2..2).expect("sweep");
        assert_eq!(m, 0.0);
        assert_eq!(u, uu);
    }

    #[test]
    fn test_rejects_range_touching_buffer_edge() {
        let uu = Array2::zeros((4, 4));
        let mut u = uu.clone();
        assert!(matches!(
            relax_rows(&mut u, &uu, 0..2),
            Err(SolverError::InvalidTopology(_))
        ));
        assert!(matches!(
            relax_rows(&mut u, &uu, 1..4),
            Err(SolverError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let uu = Array2::zeros((4, 4));
        let mut u = Array2::zeros((4, 5));
        assert!(matches!(
            relax_rows(&mut u, &uu, 1..3),
            Err(SolverError::ConfigError(_))
        ));
    }

    #[test]
    fn test_two_column_grid_sweeps_nothing() {
        let uu = Array2::from_elem((4, 2), 3.0);
        let mut u = uu.clone();
        let m = relax_rows(&mut u, &uu, 1..3).expect("sweep");
        assert_eq!(m, 0.0);
        assert_eq!(u, uu);
    }
}
