// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Convergence Aggregation
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Combining per-worker maximum-change values into one global scalar.
//!
//! The chain binding reduces every iteration: members report to the
//! coordinator, the coordinator folds with `max` and broadcasts the result
//! back, so every rank that consumes the value observes the same one. The
//! two-peer binding instead combines a single pair of scalars once at
//! teardown (see `pair::PairLink::finish`).

use std::sync::mpsc::{Receiver, Sender};

use laplace_types::error::{SolverError, SolverResult};

pub fn combine_max(a: f64, b: f64) -> f64 {
    a.max(b)
}

/// Per-iteration max-reduction over the chain's coordinator channels.
pub enum MaxAggregator {
    Coordinator {
        nworkers: usize,
        collect_rx: Receiver<f64>,
        bcast_tx: Vec<Sender<f64>>,
    },
    Member {
        report_tx: Sender<f64>,
        bcast_rx: Receiver<f64>,
    },
}

impl MaxAggregator {
    /// Fold this worker's local max into the global one. Blocks until the
    /// reduction for the current iteration completes, which also keeps the
    /// workers in lockstep across iterations.
    pub fn combine(&self, local_max: f64) -> SolverResult<f64> {
        match self {
            MaxAggregator::Coordinator {
                nworkers,
                collect_rx,
                bcast_tx,
            } => {
                let mut global = local_max;
                for _ in 1..*nworkers {
                    let reported = collect_rx.recv().map_err(|_| {
                        SolverError::ConnectionLost(
                            "a worker vanished during convergence reduction".to_string(),
                        )
                    })?;
                    global = combine_max(global, reported);
                }
                for tx in bcast_tx {
                    tx.send(global).map_err(|_| {
                        SolverError::ConnectionLost(
                            "a worker vanished during convergence broadcast".to_string(),
                        )
                    })?;
                }
                Ok(global)
            }
            MaxAggregator::Member {
                report_tx,
                bcast_rx,
            } => {
                report_tx.send(local_max).map_err(|_| {
                    SolverError::ConnectionLost(
                        "coordinator vanished before convergence reduction".to_string(),
                    )
                })?;
                bcast_rx.recv().map_err(|_| {
                    SolverError::ConnectionLost(
                        "coordinator vanished during convergence broadcast".to_string(),
                    )
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_reduce_then_broadcast_agrees_everywhere() {
        let nworkers = 4;
        let (collect_tx, collect_rx) = channel();
        let mut bcast_tx = Vec::new();
        let mut members = Vec::new();
        for _ in 1..nworkers {
            let (b_tx, b_rx) = channel();
            bcast_tx.push(b_tx);
            members.push(MaxAggregator::Member {
                report_tx: collect_tx.clone(),
                bcast_rx: b_rx,
            });
        }
        let coordinator = MaxAggregator::Coordinator {
            nworkers,
            collect_rx,
            bcast_tx,
        };

        let locals = [0.125, 0.5, 0.25];
        let handles: Vec<_> = members
            .into_iter()
            .zip(locals)
            .map(|(agg, local)| std::thread::spawn(move || agg.combine(local).expect("combine")))
            .collect();

        let global = coordinator.combine(0.0625).expect("combine");
        assert_eq!(global, 0.5);
        for h in handles {
            assert_eq!(h.join().expect("member thread"), 0.5);
        }
    }

    #[test]
    fn test_solo_coordinator_is_identity() {
        let (_tx, collect_rx) = channel();
        let agg = MaxAggregator::Coordinator {
            nworkers: 1,
            collect_rx,
            bcast_tx: Vec::new(),
        };
        assert_eq!(agg.combine(0.75).expect("combine"), 0.75);
    }

    #[test]
    fn test_vanished_coordinator_is_connection_lost() {
        let (report_tx, report_rx) = channel();
        let (_bcast_tx, bcast_rx) = channel::<f64>();
        drop(report_rx);
        let agg = MaxAggregator::Member {
            report_tx,
            bcast_rx,
        };
        match agg.combine(1.0) {
            Err(SolverError::ConnectionLost(_)) => {}
            other => panic!("expected ConnectionLost, got {other:?}"),
        }
    }
}
