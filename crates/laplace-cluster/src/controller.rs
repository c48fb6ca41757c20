// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Worker Controller
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Per-worker iteration driver shared by both bindings.
//!
//! A worker's buffer holds its owned rows plus one ghost row per interior
//! edge. Every iteration snapshots the buffer, sweeps the update range
//! against the snapshot, and swaps boundary rows with each neighbor; ghost
//! rows land in the live buffer, so the next snapshot carries them into the
//! read side of the following sweep.
//!
//! The two bindings order the steps differently and the difference is load-
//! bearing. The two-peer run seeds its ghost rows from the initial field and
//! exchanges after the sweep; the chain run receives zero-seeded scattered
//! rows and exchanges before the sweep, so ghosts are always refreshed
//! before first read. Both orderings reproduce the single-process solver
//! cell for cell.

use std::io::{Read, Write};

use ndarray::{s, Array2, ArrayView1, ArrayView2};
use rayon::{ThreadPool, ThreadPoolBuilder};

use laplace_core::partition::{split_half, RowBlock};
use laplace_core::relax::{relax_rows, relax_rows_parallel};
use laplace_types::config::RelaxConfig;
use laplace_types::error::{SolverError, SolverResult};

use crate::aggregate::combine_max;
use crate::collective::{ChainReport, ChainWorker};
use crate::pair::{PairLink, PairRole};

/// Lifecycle of one worker, for logging and post-mortems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Partitioned,
    Relaxing,
    Exchanging,
    Finalizing,
    Done,
    Aborted,
}

/// Tracks and logs a worker's phase transitions.
pub struct PhaseTracker {
    binding: &'static str,
    rank: usize,
    phase: Phase,
}

impl PhaseTracker {
    pub fn new(binding: &'static str, rank: usize) -> Self {
        Self {
            binding,
            rank,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, next: Phase) {
        log::trace!(
            "{} worker {}: {:?} -> {next:?}",
            self.binding,
            self.rank,
            self.phase
        );
        self.phase = next;
    }

    fn abort(&mut self, err: &SolverError) {
        log::error!(
            "{} worker {} aborted in {:?}: {err}",
            self.binding,
            self.rank,
            self.phase
        );
        self.phase = Phase::Aborted;
    }
}

/// One worker's padded buffers and sweep machinery.
pub struct BlockState {
    block: RowBlock,
    cols: usize,
    /// Live buffer: owned rows plus ghost rows, local indexing.
    u: Array2<f64>,
    /// Previous-iteration snapshot; the sweep reads only this.
    uu: Array2<f64>,
    pool: Option<ThreadPool>,
}

impl BlockState {
    /// Build the padded buffer from the boundary values alone. Ghost rows
    /// start at the true initial field, so the first sweep may read them
    /// before any exchange has happened.
    pub fn from_local_init(cfg: &RelaxConfig, block: RowBlock) -> SolverResult<Self> {
        Self::check_block(cfg, &block)?;
        let start = block.padded_start();
        let u = cfg.boundary.init_rows(
            block.global_rows,
            cfg.grid_cols,
            start,
            start + block.padded_rows(),
        );
        let uu = u.clone();
        let pool = Self::build_pool(cfg.threads)?;
        Ok(Self {
            block,
            cols: cfg.grid_cols,
            u,
            uu,
            pool,
        })
    }

    /// Build the padded buffer around rows received in a scatter. Ghost rows
    /// are zero and must be refreshed by an exchange before the first sweep.
    pub fn from_scattered(
        cfg: &RelaxConfig,
        block: RowBlock,
        owned: Array2<f64>,
    ) -> SolverResult<Self> {
        Self::check_block(cfg, &block)?;
        if owned.dim() != (block.row_count, cfg.grid_cols) {
            return Err(SolverError::TransferFailure(format!(
                "scattered block has shape {:?}, expected ({}, {})",
                owned.dim(),
                block.row_count,
                cfg.grid_cols
            )));
        }
        let mut u = Array2::zeros((block.padded_rows(), cfg.grid_cols));
        u.slice_mut(s![block.core_range(), ..]).assign(&owned);
        let uu = u.clone();
        let pool = Self::build_pool(cfg.threads)?;
        Ok(Self {
            block,
            cols: cfg.grid_cols,
            u,
            uu,
            pool,
        })
    }

    fn check_block(cfg: &RelaxConfig, block: &RowBlock) -> SolverResult<()> {
        if block.global_rows != cfg.grid_rows {
            return Err(SolverError::ConfigError(format!(
                "block was cut from a {}-row grid, config says {}",
                block.global_rows, cfg.grid_rows
            )));
        }
        Ok(())
    }

    fn build_pool(threads: usize) -> SolverResult<Option<ThreadPool>> {
        if threads <= 1 {
            return Ok(None);
        }
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map(Some)
            .map_err(|e| SolverError::ConfigError(format!("sweep thread pool: {e}")))
    }

    pub fn block(&self) -> &RowBlock {
        &self.block
    }

    /// Freeze the live buffer as the read side of the next sweep.
    pub fn snapshot(&mut self) {
        self.uu.assign(&self.u);
    }

    /// One Jacobi sweep over the update range. Returns the local max change.
    pub fn relax(&mut self) -> SolverResult<f64> {
        let rows = self.block.update_range();
        let Self { u, uu, pool, .. } = self;
        match pool {
            Some(pool) => pool.install(|| relax_rows_parallel(u, uu, rows)),
            None => relax_rows(u, uu, rows),
        }
    }

    /// First owned row, the one the upper neighbor needs as its lower ghost.
    pub fn top_owned_row(&self) -> Vec<f64> {
        self.u.row(self.block.core_offset()).to_vec()
    }

    /// Last owned row, the one the lower neighbor needs as its upper ghost.
    pub fn bottom_owned_row(&self) -> Vec<f64> {
        self.u
            .row(self.block.core_offset() + self.block.row_count - 1)
            .to_vec()
    }

    pub fn set_upper_ghost(&mut self, row: &[f64]) -> SolverResult<()> {
        if !self.block.has_upper_neighbor() {
            return Err(SolverError::InvalidTopology(
                "block has no upper ghost row".to_string(),
            ));
        }
        self.stage_row(0, row)
    }

    pub fn set_lower_ghost(&mut self, row: &[f64]) -> SolverResult<()> {
        if !self.block.has_lower_neighbor() {
            return Err(SolverError::InvalidTopology(
                "block has no lower ghost row".to_string(),
            ));
        }
        self.stage_row(self.block.padded_rows() - 1, row)
    }

    fn stage_row(&mut self, local: usize, row: &[f64]) -> SolverResult<()> {
        if row.len() != self.cols {
            return Err(SolverError::TransferFailure(format!(
                "ghost row has {} values, expected {}",
                row.len(),
                self.cols
            )));
        }
        self.u.row_mut(local).assign(&ArrayView1::from(row));
        Ok(())
    }

    /// Owned rows, ghost rows excluded.
    pub fn core(&self) -> ArrayView2<'_, f64> {
        self.u.slice(s![self.block.core_range(), ..])
    }
}

/// Result of one peer's half of a two-peer run.
#[derive(Debug)]
pub struct PairReport {
    pub role: PairRole,
    pub block: RowBlock,
    /// This peer's owned rows after the final iteration.
    pub grid: Array2<f64>,
    /// This peer's last-iteration max change.
    pub local_max: f64,
    /// Max over both peers; the primary combines, the secondary gets `None`.
    pub combined_max: Option<f64>,
}

/// Drive one side of the two-peer binding over an already-connected stream.
pub fn run_pair<S: Read + Write>(
    stream: S,
    role: PairRole,
    cfg: &RelaxConfig,
) -> SolverResult<PairReport> {
    let mut tracker = PhaseTracker::new("pair", role.rank());
    match pair_worker(stream, role, cfg, &mut tracker) {
        Ok(report) => {
            tracker.advance(Phase::Done);
            Ok(report)
        }
        Err(e) => {
            tracker.abort(&e);
            Err(e)
        }
    }
}

fn pair_worker<S: Read + Write>(
    stream: S,
    role: PairRole,
    cfg: &RelaxConfig,
    tracker: &mut PhaseTracker,
) -> SolverResult<PairReport> {
    cfg.validate()?;
    if cfg.iterations == 0 {
        log::warn!("zero iterations requested, the grid will be returned unrelaxed");
    }
    let [lower, upper] = split_half(cfg.grid_rows)?;
    let block = match role {
        PairRole::Secondary => lower,
        PairRole::Primary => upper,
    };
    tracker.advance(Phase::Partitioned);

    let split_row = u32::try_from(cfg.grid_rows / 2).map_err(|_| {
        SolverError::ConfigError("grid too large for the split-row handshake".to_string())
    })?;
    let mut link = PairLink::new(stream, role);
    link.handshake(split_row)?;

    let mut state = BlockState::from_local_init(cfg, block)?;
    let mut local_max = 0.0;
    for _ in 0..cfg.iterations {
        tracker.advance(Phase::Relaxing);
        state.snapshot();
        local_max = state.relax()?;

        // The exchange after the last sweep is never read; keeping it keeps
        // both peers' transfer counts identical in every iteration.
        tracker.advance(Phase::Exchanging);
        match role {
            PairRole::Secondary => {
                let incoming = link.exchange_row(&state.bottom_owned_row())?;
                state.set_lower_ghost(&incoming)?;
            }
            PairRole::Primary => {
                let incoming = link.exchange_row(&state.top_owned_row())?;
                state.set_upper_ghost(&incoming)?;
            }
        }
    }

    tracker.advance(Phase::Finalizing);
    let peer_max = link.finish(local_max)?;
    let combined_max = peer_max.map(|peer| combine_max(peer, local_max));

    Ok(PairReport {
        role,
        block: state.block().clone(),
        grid: state.core().to_owned(),
        local_max,
        combined_max,
    })
}

/// Drive one chain worker. Returns the gathered report on rank 0, `None`
/// elsewhere.
pub fn drive_chain(cfg: &RelaxConfig, worker: ChainWorker) -> SolverResult<Option<ChainReport>> {
    let mut tracker = PhaseTracker::new("chain", worker.block.rank);
    match chain_worker(cfg, worker, &mut tracker) {
        Ok(report) => {
            tracker.advance(Phase::Done);
            Ok(report)
        }
        Err(e) => {
            tracker.abort(&e);
            Err(e)
        }
    }
}

fn chain_worker(
    cfg: &RelaxConfig,
    worker: ChainWorker,
    tracker: &mut PhaseTracker,
) -> SolverResult<Option<ChainReport>> {
    let ChainWorker {
        block,
        links,
        aggregator,
        distribution,
    } = worker;
    tracker.advance(Phase::Partitioned);

    let owned = distribution.scatter_owned(cfg, &block)?;
    let mut state = BlockState::from_scattered(cfg, block, owned)?;

    let mut global_max = 0.0;
    for _ in 0..cfg.iterations {
        tracker.advance(Phase::Exchanging);
        if let Some(incoming) = links.exchange_up(&state.top_owned_row())? {
            state.set_upper_ghost(&incoming)?;
        }
        if let Some(incoming) = links.exchange_down(&state.bottom_owned_row())? {
            state.set_lower_ghost(&incoming)?;
        }

        tracker.advance(Phase::Relaxing);
        state.snapshot();
        let local_max = state.relax()?;
        global_max = aggregator.combine(local_max)?;
    }

    tracker.advance(Phase::Finalizing);
    let gathered = distribution.gather(state.block(), state.core().to_owned())?;
    Ok(gathered.map(|grid| ChainReport {
        grid,
        max_change: global_max,
        iterations: cfg.iterations,
        nworkers: state.block().nworkers,
    }))
}
