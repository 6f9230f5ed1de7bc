//! Deposit and withdraw runners
//!
//! Both runners perform the same read-modify-write on one account:
//! read the balance, add the signed amount, sleep the work delay, write the
//! result back. They differ only in whether the account lock is held.
//!
//! - [`apply_unsynchronized`] takes no lock. Two concurrent calls on the same
//!   account can both read the old balance and one write overwrites the other.
//!   That lost update is the point of the race demonstration.
//! - [`apply_synchronized`] holds the account lock for the whole section, so
//!   concurrent calls serialize and the final balance is the initial balance
//!   plus the sum of all amounts.

use super::account_store::AccountStore;
use super::pause;
use crate::types::{AccountId, Balance, LockingMode, OperationRequest, SimulationError, WorkerId};
use std::time::Duration;
use tracing::info;

/// Result of one completed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationReport {
    /// Worker that ran the operation
    pub worker: WorkerId,
    /// Target account
    pub account: AccountId,
    /// Balance read at the start of the critical section
    pub before: Balance,
    /// Balance written at the end of the critical section
    pub after: Balance,
}

/// Run an operation with the lock discipline named in the request
pub fn run_operation(
    store: &AccountStore,
    request: &OperationRequest,
    work_delay: Duration,
) -> Result<OperationReport, SimulationError> {
    info!(
        account = request.account,
        amount = request.amount.unsigned_abs(),
        "{} starting",
        request.kind()
    );

    let report = match request.locking {
        LockingMode::Unsynchronized => apply_unsynchronized(store, request, work_delay),
        LockingMode::Synchronized => apply_synchronized(store, request, work_delay),
    }?;

    info!(account = request.account, "{} completed", request.kind());
    Ok(report)
}

/// Read-modify-write with no lock held
pub fn apply_unsynchronized(
    store: &AccountStore,
    request: &OperationRequest,
    work_delay: Duration,
) -> Result<OperationReport, SimulationError> {
    let account = store.get(request.account);

    let before = account.balance_unsynchronized();
    let after = before
        .checked_add(request.amount)
        .ok_or_else(|| SimulationError::arithmetic_overflow(request.kind(), request.account))?;
    pause(work_delay);
    account.set_balance_unsynchronized(after);

    info!(
        account = request.account,
        before, after, "updated balance without lock"
    );
    Ok(OperationReport {
        worker: request.worker,
        account: request.account,
        before,
        after,
    })
}

/// Read-modify-write while holding the account lock
pub fn apply_synchronized(
    store: &AccountStore,
    request: &OperationRequest,
    work_delay: Duration,
) -> Result<OperationReport, SimulationError> {
    let mut guard = store.get(request.account).lock();
    info!(account = request.account, "acquired lock");

    let before = guard.balance();
    let after = before
        .checked_add(request.amount)
        .ok_or_else(|| SimulationError::arithmetic_overflow(request.kind(), request.account))?;
    pause(work_delay);
    guard.set_balance(after);
    info!(account = request.account, before, after, "updated balance");

    guard.unlock();
    info!(account = request.account, "released lock");

    Ok(OperationReport {
        worker: request.worker,
        account: request.account,
        before,
        after,
    })
}
