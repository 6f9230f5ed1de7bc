//! Deadlock-prone transfer: lock `from`, then `to`
//!
//! The runner has no timeout and no retry. Two workers moving funds in
//! opposite directions between the same pair of accounts can each take their
//! first lock and then wait forever for the other's.
//!
//! Waiting is done in short `try_lock_for` slices so the worker can notice an
//! [`AbandonSignal`]. That is the only way out of a deadlock and is an
//! external, destructive recovery, not part of the protocol. Every wait
//! happens before any balance is touched, so an abandoned transfer changes
//! nothing.

use super::super::abandon::AbandonSignal;
use super::super::account_store::{Account, AccountGuard, AccountStore};
use super::super::pause;
use super::super::wait_graph::WaitForGraph;
use super::{apply_transfer, TransferOutcome};
use crate::types::{SimulationError, TransferRequest, WorkerId};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delays used by the naive protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaiveTiming {
    /// Sleep between taking the first and asking for the second lock
    pub hazard_delay: Duration,

    /// Length of each wait slice between abandon-signal checks
    pub poll_interval: Duration,
}

impl Default for NaiveTiming {
    fn default() -> Self {
        Self {
            hazard_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Transfer funds by locking `from` and then `to`
pub fn run_naive_transfer(
    store: &AccountStore,
    request: &TransferRequest,
    timing: &NaiveTiming,
    abandon: &AbandonSignal,
    graph: &WaitForGraph,
) -> Result<TransferOutcome, SimulationError> {
    info!(
        amount = request.amount,
        from = request.from,
        to = request.to,
        "transfer starting"
    );

    let Some(mut from_guard) =
        acquire_or_abandon(store.get(request.from), request.worker, timing, abandon, graph)
    else {
        return Ok(abandoned(request));
    };
    let from_hold = graph.track_hold(request.from, request.worker);
    info!(
        "locked account {}, now trying to lock account {}",
        request.from, request.to
    );

    pause(timing.hazard_delay);

    let Some(mut to_guard) =
        acquire_or_abandon(store.get(request.to), request.worker, timing, abandon, graph)
    else {
        drop(from_hold);
        from_guard.unlock();
        return Ok(abandoned(request));
    };
    let to_hold = graph.track_hold(request.to, request.worker);
    info!("locked account {}", request.to);

    let result = apply_transfer(&mut from_guard, &mut to_guard, request.amount);

    to_guard.unlock();
    drop(to_hold);
    from_guard.unlock();
    drop(from_hold);

    let (from_balance, to_balance) = result?;
    info!(
        amount = request.amount,
        "transferred (account {} new balance: {}, account {} new balance: {}), locks released",
        request.from,
        from_balance,
        request.to,
        to_balance
    );

    Ok(TransferOutcome::Completed {
        from_balance,
        to_balance,
        attempts: 1,
    })
}

fn abandoned(request: &TransferRequest) -> TransferOutcome {
    warn!(
        from = request.from,
        to = request.to,
        "transfer abandoned while blocked, no funds moved"
    );
    TransferOutcome::Abandoned
}

/// Take the lock, blocking until it is free or the abandon signal is raised
fn acquire_or_abandon<'a>(
    account: &'a Account,
    worker: WorkerId,
    timing: &NaiveTiming,
    abandon: &AbandonSignal,
    graph: &WaitForGraph,
) -> Option<AccountGuard<'a>> {
    if let Some(guard) = account.try_lock() {
        return Some(guard);
    }

    debug!(account = account.id(), "blocked waiting for lock");
    graph.begin_wait(worker, account.id());

    let slice = timing.poll_interval.max(Duration::from_millis(1));
    let guard = loop {
        if abandon.is_raised() {
            break None;
        }
        if let Some(guard) = account.try_lock_for(slice) {
            break Some(guard);
        }
    };

    graph.end_wait(worker);
    guard
}
