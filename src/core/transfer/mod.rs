//! Two-account transfers
//!
//! A transfer debits `from` and credits `to` while holding both account locks.
//! How the two locks are acquired is what separates the protocols:
//!
//! - [`naive`]: lock `from`, then `to`, in caller order. Two transfers in
//!   opposite directions can each hold one lock and wait forever for the other.
//! - [`ordered`]: lock the lower account id first, try-lock the higher one,
//!   and on failure release, back off and retry. Every worker acquires in the
//!   same global order, so no circular wait can form.
//!
//! Both protocols apply the debit and the credit together before releasing
//! either lock, or not at all.

pub mod naive;
pub mod ordered;

pub use naive::{run_naive_transfer, NaiveTiming};
pub use ordered::{run_ordered_transfer, RetryPolicy};

use super::abandon::AbandonSignal;
use super::account_store::{AccountGuard, AccountStore};
use super::wait_graph::WaitForGraph;
use crate::types::{Balance, SimulationError, TransferMode, TransferRequest};
use std::sync::Arc;

/// How a transfer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Both balances were updated
    Completed {
        /// Balance of the source account after the debit
        from_balance: Balance,
        /// Balance of the destination account after the credit
        to_balance: Balance,
        /// Lock attempts used, 1 for an uncontended transfer
        attempts: u32,
    },

    /// Retry budget exhausted before both locks were held; nothing changed
    Aborted {
        /// Lock attempts used
        attempts: u32,
    },

    /// Worker gave up a blocked wait after the abandon signal; nothing changed
    Abandoned,
}

impl TransferOutcome {
    /// Whether the transfer moved funds
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed { .. })
    }

    /// Short name for reports
    pub fn label(&self) -> &'static str {
        match self {
            TransferOutcome::Completed { .. } => "completed",
            TransferOutcome::Aborted { .. } => "aborted",
            TransferOutcome::Abandoned => "abandoned",
        }
    }
}

/// Everything a transfer worker may need besides the store
///
/// The abandon signal and wait-for graph are only consulted by naive
/// transfers.
#[derive(Debug, Clone, Default)]
pub struct TransferEnv {
    /// Delays for the naive protocol
    pub naive: NaiveTiming,
    /// Retry budget and back-off for the ordered protocol
    pub retry: RetryPolicy,
    /// Destructive abandon signal for blocked naive workers
    pub abandon: AbandonSignal,
    /// Hold and wait edges published by naive workers
    pub graph: Arc<WaitForGraph>,
}

/// Run a transfer with the protocol named in the request
pub fn run_transfer(
    store: &AccountStore,
    request: &TransferRequest,
    env: &TransferEnv,
) -> Result<TransferOutcome, SimulationError> {
    match request.mode {
        TransferMode::Naive => {
            run_naive_transfer(store, request, &env.naive, &env.abandon, &env.graph)
        }
        TransferMode::Ordered => run_ordered_transfer(store, request, &env.retry),
    }
}

/// Debit `from` and credit `to`, both or neither
///
/// Both new balances are computed before either is written, so an overflow on
/// one side leaves both accounts untouched.
fn apply_transfer(
    from: &mut AccountGuard<'_>,
    to: &mut AccountGuard<'_>,
    amount: Balance,
) -> Result<(Balance, Balance), SimulationError> {
    let from_balance = from
        .balance()
        .checked_sub(amount)
        .ok_or_else(|| SimulationError::arithmetic_overflow("debit", from.id()))?;
    let to_balance = to
        .balance()
        .checked_add(amount)
        .ok_or_else(|| SimulationError::arithmetic_overflow("credit", to.id()))?;

    from.set_balance(from_balance);
    to.set_balance(to_balance);
    Ok((from_balance, to_balance))
}
