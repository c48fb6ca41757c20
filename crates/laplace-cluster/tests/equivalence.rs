// ─────────────────────────────────────────────────────────────────────
// Laplace Relax — Distributed/Serial Equivalence Suite
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! End-to-end runs of both bindings, checked against the single-process
//! reference solver.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use ndarray::{concatenate, Array2, Axis};

use laplace_cluster::collective::run_chain;
use laplace_cluster::controller::{run_pair, PairReport};
use laplace_cluster::pair::{PairLink, PairRole};
use laplace_core::reference::solve_config;
use laplace_types::config::RelaxConfig;
use laplace_types::error::SolverError;
use laplace_types::state::BoundaryValues;

fn test_config(rows: usize, cols: usize, iterations: usize) -> RelaxConfig {
    RelaxConfig {
        grid_rows: rows,
        grid_cols: cols,
        iterations,
        threads: 1,
        boundary: BoundaryValues::default(),
    }
}

fn tcp_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let connector = thread::spawn(move || TcpStream::connect(addr).expect("connect"));
    let (accepted, _) = listener.accept().expect("accept");
    (accepted, connector.join().expect("connector thread"))
}

fn run_both_peers<S>(primary: S, secondary: S, cfg: &RelaxConfig) -> (PairReport, PairReport)
where
    S: Read + Write + Send,
{
    thread::scope(|scope| {
        let handle = scope
            .spawn(move || run_pair(secondary, PairRole::Secondary, cfg).expect("secondary run"));
        let primary = run_pair(primary, PairRole::Primary, cfg).expect("primary run");
        (primary, handle.join().expect("secondary thread"))
    })
}

/// Secondary's rows sit above the primary's; stacking them restores the
/// global grid.
fn stitch(secondary: &PairReport, primary: &PairReport) -> Array2<f64> {
    concatenate(Axis(0), &[secondary.grid.view(), primary.grid.view()]).expect("stitch")
}

#[test]
fn test_two_peers_match_the_reference_on_the_4x4_grid() {
    let _ = env_logger::builder().is_test(true).try_init();
    let cfg = test_config(4, 4, 1000);
    let (expected_grid, expected_max) = solve_config(&cfg).expect("reference");

    let (server, client) = tcp_pair();
    let (primary, secondary) = run_both_peers(server, client, &cfg);

    let stitched = stitch(&secondary, &primary);
    for ((x, y), &value) in stitched.indexed_iter() {
        assert!(
            (value - expected_grid[[x, y]]).abs() <= 1e-9,
            "cell ({x},{y}): {value} vs {}",
            expected_grid[[x, y]]
        );
    }

    let combined = primary.combined_max.expect("primary combines the maxima");
    assert!((combined - expected_max).abs() <= 1e-9);
    assert_eq!(secondary.combined_max, None);
}

#[test]
fn test_two_peers_match_the_reference_on_an_odd_split() {
    // 9 rows: secondary owns 4, primary owns 5.
    let cfg = test_config(9, 7, 300);
    let (expected_grid, _) = solve_config(&cfg).expect("reference");

    let (server, client) = tcp_pair();
    let (primary, secondary) = run_both_peers(server, client, &cfg);
    assert_eq!(secondary.grid.nrows(), 4);
    assert_eq!(primary.grid.nrows(), 5);

    assert_eq!(stitch(&secondary, &primary), expected_grid);
}

/// Wraps a stream so every read and write moves at most one byte. The
/// chunked transfer loops must be insensitive to how a transport slices
/// the payload.
struct OneBytePipe {
    inner: TcpStream,
}

impl Read for OneBytePipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let take = buf.len().min(1);
        self.inner.read(&mut buf[..take])
    }
}

impl Write for OneBytePipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let give = buf.len().min(1);
        self.inner.write(&buf[..give])
    }
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[test]
fn test_two_peers_survive_a_one_byte_transport() {
    let cfg = test_config(6, 5, 50);
    let (expected_grid, _) = solve_config(&cfg).expect("reference");

    let (server, client) = tcp_pair();
    let (primary, secondary) = run_both_peers(
        OneBytePipe { inner: server },
        OneBytePipe { inner: client },
        &cfg,
    );

    assert_eq!(stitch(&secondary, &primary), expected_grid);
}

#[test]
fn test_peer_vanishing_mid_run_is_fatal() {
    let cfg = test_config(8, 6, 200);
    let (server, client) = tcp_pair();

    // The peer completes the handshake and a single exchange, then goes away.
    let quitter = thread::spawn(move || {
        let mut link = PairLink::new(client, PairRole::Secondary);
        link.handshake(4).expect("handshake");
        link.exchange_row(&[0.0; 6]).expect("first exchange");
    });

    let result = run_pair(server, PairRole::Primary, &cfg);
    quitter.join().expect("quitter thread");
    match result {
        Err(SolverError::ConnectionLost(_)) | Err(SolverError::TransferFailure(_)) => {}
        other => panic!("expected a fatal transfer error, got {other:?}"),
    }
}

/// Stream stand-in that fails the test if any traffic happens.
struct NoTraffic;

impl Read for NoTraffic {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        panic!("no traffic expected before validation");
    }
}

impl Write for NoTraffic {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        panic!("no traffic expected before validation");
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_pair_rejects_tiny_grid_before_any_traffic() {
    let cfg = test_config(3, 8, 10);
    match run_pair(NoTraffic, PairRole::Primary, &cfg) {
        Err(SolverError::InvalidTopology(_)) => {}
        other => panic!("expected InvalidTopology, got {other:?}"),
    }
}

#[test]
fn test_chain_matches_the_reference_for_many_widths() {
    let cfg = test_config(13, 9, 200);
    let (expected_grid, expected_max) = solve_config(&cfg).expect("reference");

    for nworkers in [1, 2, 3, 5] {
        let report = run_chain(&cfg, nworkers).expect("chain run");
        assert_eq!(report.nworkers, nworkers);
        assert_eq!(report.iterations, 200);
        assert_eq!(report.grid, expected_grid, "{nworkers} workers");
        assert_eq!(report.max_change, expected_max, "{nworkers} workers");
    }
}

#[test]
fn test_chain_with_pooled_sweeps_matches_the_reference() {
    let cfg = RelaxConfig {
        threads: 2,
        ..test_config(12, 8, 100)
    };
    let (expected_grid, expected_max) = solve_config(&cfg).expect("reference");

    let report = run_chain(&cfg, 2).expect("chain run");
    assert_eq!(report.grid, expected_grid);
    assert_eq!(report.max_change, expected_max);
}

#[test]
fn test_chain_rejects_undersized_grid_before_any_work() {
    let cfg = test_config(3, 8, 10);
    match run_chain(&cfg, 4) {
        Err(SolverError::InvalidTopology(_)) => {}
        other => panic!("expected InvalidTopology, got {other:?}"),
    }
}
