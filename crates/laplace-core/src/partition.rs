// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Grid Partitioning
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Contiguous row-block decomposition of the global grid.
//!
//! Two entry points: `partition_rows` distributes X rows across W workers as
//! evenly as possible (remainder to the lowest ranks), and `split_half` is
//! the two-peer special case that splits at exactly `X/2` regardless of
//! parity. Both reject topologies where a worker would own no interior row.

use std::ops::Range;

use laplace_types::error::{SolverError, SolverResult};

/// One worker's slice of the global grid: a contiguous, non-overlapping run
/// of rows. Blocks for a run always cover the grid exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBlock {
    pub rank: usize,
    pub nworkers: usize,
    pub global_rows: usize,
    /// First owned row in global indexing.
    pub row_offset: usize,
    /// Number of owned rows.
    pub row_count: usize,
}

impl RowBlock {
    pub fn has_upper_neighbor(&self) -> bool {
        self.row_offset > 0
    }

    pub fn has_lower_neighbor(&self) -> bool {
        self.row_offset + self.row_count < self.global_rows
    }

    /// Rows in the worker's local buffer: owned rows plus one ghost row per
    /// interior edge.
    pub fn padded_rows(&self) -> usize {
        self.row_count
            + usize::from(self.has_upper_neighbor())
            + usize::from(self.has_lower_neighbor())
    }

    /// Local index of the first owned row within the padded buffer.
    pub fn core_offset(&self) -> usize {
        usize::from(self.has_upper_neighbor())
    }

    /// Global index of the first row of the padded buffer (ghost included).
    pub fn padded_start(&self) -> usize {
        self.row_offset - self.core_offset()
    }

    /// Owned rows in local (padded) indexing.
    pub fn core_range(&self) -> Range<usize> {
        self.core_offset()..self.core_offset() + self.row_count
    }

    /// Rows this worker updates each sweep, in local indexing: the owned rows
    /// minus the global Dirichlet rows (row 0 and row X-1).
    pub fn update_range(&self) -> Range<usize> {
        let mut start = self.core_offset();
        let mut end = start + self.row_count;
        if self.row_offset == 0 {
            start += 1;
        }
        if !self.has_lower_neighbor() {
            end -= 1;
        }
        start..end
    }
}

/// Split `global_rows` across `nworkers` contiguous row blocks.
///
/// `row_count[i] = X/W + (1 if i < X%W else 0)`; offsets are the prefix sum.
/// Every worker must own at least one interior row to update, hence the
/// `X >= 2W` requirement.
pub fn partition_rows(global_rows: usize, nworkers: usize) -> SolverResult<Vec<RowBlock>> {
    if nworkers == 0 {
        return Err(SolverError::InvalidTopology(
            "worker count must be >= 1".to_string(),
        ));
    }
    if global_rows < 2 * nworkers {
        return Err(SolverError::InvalidTopology(format!(
            "cannot split {global_rows} rows across {nworkers} workers: \
             every worker needs at least one interior row"
        )));
    }

    let base = global_rows / nworkers;
    let rem = global_rows % nworkers;
    let mut blocks = Vec::with_capacity(nworkers);
    let mut cursor = 0usize;
    for rank in 0..nworkers {
        let row_count = base + usize::from(rank < rem);
        blocks.push(RowBlock {
            rank,
            nworkers,
            global_rows,
            row_offset: cursor,
            row_count,
        });
        cursor += row_count;
    }
    Ok(blocks)
}

/// The two-peer split: block 0 owns `[0, X/2)`, block 1 owns `[X/2, X)`.
///
/// This is deliberately `X/2`, not the remainder-balanced split of
/// `partition_rows`: rows `X/2 - 1` and `X/2` are the mutually exchanged
/// boundary between the two peers.
pub fn split_half(global_rows: usize) -> SolverResult<[RowBlock; 2]> {
    if global_rows < 4 {
        return Err(SolverError::InvalidTopology(format!(
            "two-peer split needs at least 4 rows, got {global_rows}"
        )));
    }
    let half = global_rows / 2;
    Ok([
        RowBlock {
            rank: 0,
            nworkers: 2,
            global_rows,
            row_offset: 0,
            row_count: half,
        },
        RowBlock {
            rank: 1,
            nworkers: 2,
            global_rows,
            row_offset: half,
            row_count: global_rows - half,
        },
    ])
}
