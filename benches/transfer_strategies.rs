//! Benchmark suite for comparing lock protocols
//!
//! Measures the locking overhead of each protocol with every artificial delay
//! set to zero, using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! - `naive_transfer` / `ordered_transfer`: one uncontended transfer
//! - `opposite_ordered_transfers`: two threads transferring in opposite directions
//! - `synchronized_operation` / `unsynchronized_operation`: one deposit

use bank_lock_sim::core::{
    run_naive_transfer, run_operation, run_ordered_transfer, AbandonSignal, AccountStore,
    NaiveTiming, RetryPolicy, WaitForGraph,
};
use bank_lock_sim::types::{LockingMode, OperationRequest, TransferMode, TransferRequest};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    divan::main();
}

const NO_HAZARD: NaiveTiming = NaiveTiming {
    hazard_delay: Duration::ZERO,
    poll_interval: Duration::from_millis(1),
};

const NO_BACKOFF: RetryPolicy = RetryPolicy {
    max_attempts: 5,
    backoff_min: Duration::ZERO,
    backoff_max: Duration::ZERO,
};

/// Benchmark one uncontended naive transfer
#[divan::bench]
fn naive_transfer(bencher: divan::Bencher) {
    let store = AccountStore::new(2, 1_000_000).expect("Failed to create store");
    let abandon = AbandonSignal::new();
    let graph = WaitForGraph::new();
    let request = TransferRequest::new(1, 0, 1, 1, TransferMode::Naive);

    bencher.bench_local(|| {
        run_naive_transfer(&store, &request, &NO_HAZARD, &abandon, &graph)
            .expect("Transfer failed")
    });
}

/// Benchmark one uncontended ordered transfer
#[divan::bench]
fn ordered_transfer(bencher: divan::Bencher) {
    let store = AccountStore::new(2, 1_000_000).expect("Failed to create store");
    let request = TransferRequest::new(1, 1, 0, 1, TransferMode::Ordered);

    bencher.bench_local(|| {
        run_ordered_transfer(&store, &request, &NO_BACKOFF).expect("Transfer failed")
    });
}

/// Benchmark two opposite ordered transfers on separate threads
#[divan::bench(sample_count = 50)]
fn opposite_ordered_transfers() {
    let store = Arc::new(AccountStore::new(2, 1_000).expect("Failed to create store"));

    let workers: Vec<_> = [(1, 0, 1, 30), (2, 1, 0, 20)]
        .into_iter()
        .map(|(worker, from, to, amount)| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let request = TransferRequest::new(worker, from, to, amount, TransferMode::Ordered);
                run_ordered_transfer(&store, &request, &NO_BACKOFF).expect("Transfer failed")
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("Worker panicked");
    }
}

/// Benchmark one synchronized deposit
#[divan::bench]
fn synchronized_operation(bencher: divan::Bencher) {
    let store = AccountStore::new(1, 0).expect("Failed to create store");
    let request = OperationRequest::new(1, 0, 1, LockingMode::Synchronized);

    bencher.bench_local(|| run_operation(&store, &request, Duration::ZERO).expect("Operation failed"));
}

/// Benchmark one unsynchronized deposit
#[divan::bench]
fn unsynchronized_operation(bencher: divan::Bencher) {
    let store = AccountStore::new(1, 0).expect("Failed to create store");
    let request = OperationRequest::new(1, 0, 1, LockingMode::Unsynchronized);

    bencher.bench_local(|| run_operation(&store, &request, Duration::ZERO).expect("Operation failed"));
}
