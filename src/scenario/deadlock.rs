//! Phase 3: deadlock from inconsistent lock order
//!
//! Two naive transfers run in opposite directions between the same pair of
//! accounts. Each takes its source lock, waits out the hazard delay, then asks
//! for its destination lock, which the other worker holds. The phase watches
//! the wait-for graph until it shows a circular wait or both workers return.
//! Only a confirmed cycle raises the abandon signal, after which both workers
//! are joined and the two locks reinitialized.

use super::worker::{collect_transfers, spawn_transfers, WorkerSet};
use super::{pair_total, PhaseKind, PhaseOutcome, ScenarioContext, ScenarioPhase};
use crate::core::WaitForGraph;
use crate::types::{SimulationError, TransferMode, TransferRequest, WorkerId};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Runs opposite naive transfers and recovers from the resulting deadlock
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlockPhase;

impl ScenarioPhase for DeadlockPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Deadlock
    }

    fn run(&self, ctx: &mut ScenarioContext) -> Result<PhaseOutcome, SimulationError> {
        let config = ctx.config().clone();
        let (a, b) = config.transfer_accounts;

        let requests = [
            TransferRequest::new(ctx.next_worker(), a, b, config.forward_amount, TransferMode::Naive),
            TransferRequest::new(ctx.next_worker(), b, a, config.reverse_amount, TransferMode::Naive),
        ];
        for request in &requests {
            request.validate(ctx.store().len())?;
        }

        let store = ctx.exclusive_store("deadlock setup")?;
        store.set_balance(a, config.initial_balance)?;
        store.set_balance(b, config.initial_balance)?;
        let before_total = pair_total(ctx.store(), a, b)?;
        info!(
            "accounts {a} and {b} at {}, starting opposite transfers in caller lock order",
            config.initial_balance
        );

        let env = config.transfer_env();
        let workers = spawn_transfers(ctx, &requests, &env)?;

        let cycle = watch_for_cycle(
            &workers,
            &env.graph,
            config.observation_window,
            config.naive.poll_interval,
        );
        match &cycle {
            Some(workers) => warn!(
                "deadlock detected: workers {:?} each hold one account and wait for the other",
                workers
            ),
            None => info!("no circular wait formed, both transfers returned"),
        }

        if cycle.is_some() {
            warn!("raising abandon signal for blocked workers");
            env.abandon.raise();
        }
        let transfers = collect_transfers(workers)?;

        let (recovered, stale_locks) = if cycle.is_some() {
            let ids = vec![a, b];
            let stale = ctx
                .exclusive_store("reinitialize locks")?
                .reinitialize_locks(&ids)?;
            info!("deadlock recovery complete, locks on accounts {a} and {b} reinitialized");
            (ids, stale)
        } else {
            (Vec::new(), Vec::new())
        };

        let after_total = pair_total(ctx.store(), a, b)?;
        if after_total != before_total {
            warn!("accounts {a} and {b} total {after_total} after recovery, expected {before_total}");
        }

        Ok(PhaseOutcome::Deadlock {
            cycle,
            transfers,
            recovered,
            stale_locks,
            before_total,
            after_total,
        })
    }
}

/// Poll the wait-for graph until a cycle shows up or every worker returns
///
/// A naive transfer only blocks on a lock held by another worker in the set,
/// so without a cycle every worker eventually returns. Passing `window`
/// without either is logged once and watching continues.
fn watch_for_cycle<T: Send + 'static>(
    workers: &WorkerSet<T>,
    graph: &WaitForGraph,
    window: Duration,
    poll: Duration,
) -> Option<Vec<WorkerId>> {
    let started = Instant::now();
    let poll = poll.max(Duration::from_millis(1));
    let mut window_passed = false;

    loop {
        if let Some(cycle) = graph.find_cycle() {
            return Some(cycle);
        }
        if workers.all_finished() {
            return None;
        }
        if !window_passed && started.elapsed() >= window {
            info!("no circular wait after {window:?}, still watching");
            window_passed = true;
        }
        thread::sleep(poll);
    }
}
