// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Chain Binding
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! N-worker chain over in-process message channels.
//!
//! Workers are ordered by rank; each holds one channel pair per adjacent
//! neighbor, one per direction, so traffic in one direction never waits on
//! the other. Sends are buffered and never block, which rules out circular
//! waits no matter how the workers interleave. The grid is scattered from
//! and gathered to rank 0, which also coordinates the per-iteration
//! max-reduction (see [`crate::aggregate`]).

use std::sync::mpsc::{channel, Receiver, Sender};

use ndarray::{s, Array2};

use laplace_core::partition::{partition_rows, RowBlock};
use laplace_types::config::RelaxConfig;
use laplace_types::error::{SolverError, SolverResult};

use crate::aggregate::MaxAggregator;
use crate::controller;

/// One direction-paired channel to an adjacent worker.
pub struct NeighborLink {
    pub(crate) tx: Sender<Vec<f64>>,
    pub(crate) rx: Receiver<Vec<f64>>,
}

impl NeighborLink {
    /// Send our boundary row, then block on the neighbor's. The send is
    /// buffered, so both sides can send before either receives.
    fn swap(&self, outgoing: &[f64]) -> SolverResult<Vec<f64>> {
        self.tx.send(outgoing.to_vec()).map_err(|_| {
            SolverError::ConnectionLost("neighbor vanished before the halo send".to_string())
        })?;
        let incoming = self.rx.recv().map_err(|_| {
            SolverError::ConnectionLost("neighbor vanished during the halo receive".to_string())
        })?;
        if incoming.len() != outgoing.len() {
            return Err(SolverError::TransferFailure(format!(
                "halo row has {} values, expected {}",
                incoming.len(),
                outgoing.len()
            )));
        }
        Ok(incoming)
    }
}

/// This worker's links to its chain neighbors. End-of-chain workers are
/// missing one side.
pub struct ChainLinks {
    pub rank: usize,
    pub nworkers: usize,
    pub(crate) up: Option<NeighborLink>,
    pub(crate) down: Option<NeighborLink>,
}

impl ChainLinks {
    /// Swap boundary rows with the rank-below-us neighbor (lower row
    /// indices). `Ok(None)` when this worker is the top of the chain.
    pub fn exchange_up(&self, outgoing: &[f64]) -> SolverResult<Option<Vec<f64>>> {
        match &self.up {
            Some(link) => link.swap(outgoing).map(Some),
            None => Ok(None),
        }
    }

    /// Swap boundary rows with the rank-above-us neighbor (higher row
    /// indices). `Ok(None)` when this worker is the bottom of the chain.
    pub fn exchange_down(&self, outgoing: &[f64]) -> SolverResult<Option<Vec<f64>>> {
        match &self.down {
            Some(link) => link.swap(outgoing).map(Some),
            None => Ok(None),
        }
    }
}

/// Scatter/gather endpoints, rooted at rank 0. Exactly the owned rows move;
/// ghost rows are never part of a scatter or gather payload.
pub enum GridDistribution {
    Coordinator {
        blocks: Vec<RowBlock>,
        scatter_tx: Vec<Sender<Array2<f64>>>,
        gather_rx: Receiver<(usize, Array2<f64>)>,
    },
    Member {
        scatter_rx: Receiver<Array2<f64>>,
        gather_tx: Sender<(usize, Array2<f64>)>,
    },
}

impl GridDistribution {
    /// Hand every worker its owned rows. The coordinator materializes the
    /// full initial grid and slices it; members receive their block.
    pub fn scatter_owned(
        &self,
        cfg: &RelaxConfig,
        block: &RowBlock,
    ) -> SolverResult<Array2<f64>> {
        match self {
            GridDistribution::Coordinator {
                blocks, scatter_tx, ..
            } => {
                let full = cfg.boundary.init_grid(cfg.grid_rows, cfg.grid_cols);
                for (b, tx) in blocks.iter().skip(1).zip(scatter_tx) {
                    let rows = full
                        .slice(s![b.row_offset..b.row_offset + b.row_count, ..])
                        .to_owned();
                    tx.send(rows).map_err(|_| {
                        SolverError::ConnectionLost(format!(
                            "worker {} vanished before receiving its rows",
                            b.rank
                        ))
                    })?;
                }
                Ok(full
                    .slice(s![block.row_offset..block.row_offset + block.row_count, ..])
                    .to_owned())
            }
            GridDistribution::Member { scatter_rx, .. } => scatter_rx.recv().map_err(|_| {
                SolverError::ConnectionLost(
                    "coordinator vanished before scattering the grid".to_string(),
                )
            }),
        }
    }

    /// Reassemble the full grid at rank 0 from every worker's owned rows.
    /// Members hand theirs over and get `Ok(None)`.
    pub fn gather(
        &self,
        block: &RowBlock,
        owned: Array2<f64>,
    ) -> SolverResult<Option<Array2<f64>>> {
        match self {
            GridDistribution::Coordinator {
                blocks, gather_rx, ..
            } => {
                let cols = owned.ncols();
                let mut full = Array2::zeros((block.global_rows, cols));
                full.slice_mut(s![block.row_offset..block.row_offset + block.row_count, ..])
                    .assign(&owned);
                for _ in 1..blocks.len() {
                    let (rank, rows) = gather_rx.recv().map_err(|_| {
                        SolverError::ConnectionLost(
                            "a worker vanished before returning its rows".to_string(),
                        )
                    })?;
                    let b = blocks.get(rank).ok_or_else(|| {
                        SolverError::TransferFailure(format!("gather from unknown rank {rank}"))
                    })?;
                    if rows.dim() != (b.row_count, cols) {
                        return Err(SolverError::TransferFailure(format!(
                            "gathered block from rank {rank} has shape {:?}, expected ({}, {cols})",
                            rows.dim(),
                            b.row_count
                        )));
                    }
                    full.slice_mut(s![b.row_offset..b.row_offset + b.row_count, ..])
                        .assign(&rows);
                }
                Ok(Some(full))
            }
            GridDistribution::Member { gather_tx, .. } => {
                gather_tx.send((block.rank, owned)).map_err(|_| {
                    SolverError::ConnectionLost(
                        "coordinator vanished before the gather".to_string(),
                    )
                })?;
                Ok(None)
            }
        }
    }
}

/// Everything one chain worker needs, bundled for handoff to its thread.
pub struct ChainWorker {
    pub block: RowBlock,
    pub links: ChainLinks,
    pub aggregator: MaxAggregator,
    pub distribution: GridDistribution,
}

/// Result of a chain run, reported by the coordinator.
#[derive(Debug)]
pub struct ChainReport {
    /// The fully gathered grid after the final iteration.
    pub grid: Array2<f64>,
    /// Global maximum change of the final iteration.
    pub max_change: f64,
    pub iterations: usize,
    pub nworkers: usize,
}

pub(crate) fn build_links(nworkers: usize) -> Vec<ChainLinks> {
    let mut links: Vec<ChainLinks> = (0..nworkers)
        .map(|rank| ChainLinks {
            rank,
            nworkers,
            up: None,
            down: None,
        })
        .collect();
    for upper in 0..nworkers.saturating_sub(1) {
        let lower = upper + 1;
        let (down_tx, down_rx) = channel();
        let (up_tx, up_rx) = channel();
        links[upper].down = Some(NeighborLink {
            tx: down_tx,
            rx: up_rx,
        });
        links[lower].up = Some(NeighborLink {
            tx: up_tx,
            rx: down_rx,
        });
    }
    links
}

fn build_aggregators(nworkers: usize) -> Vec<MaxAggregator> {
    let (collect_tx, collect_rx) = channel();
    let mut bcast_tx = Vec::new();
    let mut members = Vec::new();
    for _ in 1..nworkers {
        let (b_tx, b_rx) = channel();
        bcast_tx.push(b_tx);
        // Per-iteration framing on the shared collect channel holds because
        // a member cannot report iteration k+1 before it has received the
        // iteration-k broadcast, which the coordinator only sends after
        // collecting every report.
        members.push(MaxAggregator::Member {
            report_tx: collect_tx.clone(),
            bcast_rx: b_rx,
        });
    }
    let mut out = vec![MaxAggregator::Coordinator {
        nworkers,
        collect_rx,
        bcast_tx,
    }];
    out.extend(members);
    out
}

fn build_distribution(nworkers: usize, blocks: &[RowBlock]) -> Vec<GridDistribution> {
    let (gather_tx, gather_rx) = channel();
    let mut scatter_tx = Vec::new();
    let mut members = Vec::new();
    for _ in 1..nworkers {
        let (s_tx, s_rx) = channel();
        scatter_tx.push(s_tx);
        members.push(GridDistribution::Member {
            scatter_rx: s_rx,
            gather_tx: gather_tx.clone(),
        });
    }
    let mut out = vec![GridDistribution::Coordinator {
        blocks: blocks.to_vec(),
        scatter_tx,
        gather_rx,
    }];
    out.extend(members);
    out
}

/// Run the full chain: partition, spawn one thread per worker past rank 0,
/// iterate, gather. Topology is rejected before any thread or buffer exists.
pub fn run_chain(cfg: &RelaxConfig, nworkers: usize) -> SolverResult<ChainReport> {
    cfg.validate()?;
    let blocks = partition_rows(cfg.grid_rows, nworkers)?;
    log::debug!(
        "chain run: {} rows x {} cols across {nworkers} workers, {} iterations",
        cfg.grid_rows,
        cfg.grid_cols,
        cfg.iterations
    );

    let mut links = build_links(nworkers);
    let mut aggregators = build_aggregators(nworkers);
    let mut distributions = build_distribution(nworkers, &blocks);

    // Assemble in reverse so each worker pops its own endpoints by rank.
    let mut workers: Vec<ChainWorker> = Vec::with_capacity(nworkers);
    for block in blocks.into_iter().rev() {
        workers.push(ChainWorker {
            block,
            links: links.pop().ok_or_else(missing_endpoint)?,
            aggregator: aggregators.pop().ok_or_else(missing_endpoint)?,
            distribution: distributions.pop().ok_or_else(missing_endpoint)?,
        });
    }
    workers.reverse();

    std::thread::scope(|scope| {
        let mut workers = workers.into_iter();
        let root = workers.next().ok_or_else(|| {
            SolverError::InvalidTopology("worker count must be >= 1".to_string())
        })?;
        let handles: Vec<_> = workers
            .map(|worker| scope.spawn(move || controller::drive_chain(cfg, worker)))
            .collect();

        // Rank 0 runs on the calling thread. Join everyone before deciding
        // the outcome so a failing run never leaves threads behind.
        let root_result = controller::drive_chain(cfg, root);
        let mut member_err = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    if member_err.is_none() {
                        member_err = Some(e);
                    }
                }
                Err(_) => {
                    if member_err.is_none() {
                        member_err = Some(SolverError::TransferFailure(
                            "worker thread panicked".to_string(),
                        ));
                    }
                }
            }
        }
        let report = root_result?;
        if let Some(e) = member_err {
            return Err(e);
        }
        report.ok_or_else(|| {
            SolverError::TransferFailure("coordinator produced no gathered grid".to_string())
        })
    })
}

fn missing_endpoint() -> SolverError {
    SolverError::TransferFailure("chain endpoint sets fell out of step".to_string())
}
