//! Core simulation components
//!
//! This module contains the shared state and the worker-side runners:
//! - `account_store` - Fixed collection of independently lockable accounts
//! - `operation` - Unsynchronized and synchronized deposit/withdraw runners
//! - `transfer` - Naive and deadlock-avoiding two-account transfers
//! - `wait_graph` - Hold/wait edges used to confirm a circular wait
//! - `abandon` - Destructive abandon signal for blocked naive workers

pub mod abandon;
pub mod account_store;
pub mod operation;
pub mod transfer;
pub mod wait_graph;

pub use abandon::AbandonSignal;
pub use account_store::{sum_balances, Account, AccountGuard, AccountStore};
pub use operation::{run_operation, OperationReport};
pub use transfer::{
    run_naive_transfer, run_ordered_transfer, run_transfer, NaiveTiming, RetryPolicy, TransferEnv,
    TransferOutcome,
};
pub use wait_graph::WaitForGraph;

use std::time::Duration;

/// Sleep used to widen or desynchronize timing windows, skipped when zero
pub(crate) fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
