//! Simulation configuration
//!
//! Controls account setup, operation and transfer amounts, and every timing
//! window used by the four phases. Delays only widen or desynchronize timing
//! windows; correctness never depends on them.

use crate::core::{NaiveTiming, RetryPolicy, TransferEnv};
use crate::types::{AccountId, Balance};
use std::time::Duration;
use tracing::warn;

/// Configuration for a simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Number of accounts in the store
    pub accounts: usize,
    /// Balance every account starts each phase with
    pub initial_balance: Balance,
    /// Magnitude of the deposit/withdraw pair used by the race and mutex phases
    pub operation_amount: Balance,
    /// Accounts used by the deadlock and avoidance phases
    pub transfer_accounts: (AccountId, AccountId),
    /// Amount moved from the first transfer account to the second
    pub forward_amount: Balance,
    /// Amount moved from the second transfer account to the first
    pub reverse_amount: Balance,
    /// Artificial work inside an operation's critical section
    pub work_delay: Duration,
    /// Naive transfer delays
    pub naive: NaiveTiming,
    /// Ordered transfer retry budget and back-off
    pub retry: RetryPolicy,
    /// How long the deadlock phase watches before noting that no circular wait has formed
    pub observation_window: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            accounts: 5,
            initial_balance: 100,
            operation_amount: 50,
            transfer_accounts: (0, 1),
            forward_amount: 30,
            reverse_amount: 20,
            work_delay: Duration::from_millis(100),
            naive: NaiveTiming::default(),
            retry: RetryPolicy::default(),
            observation_window: Duration::from_secs(1),
        }
    }
}

impl SimulationConfig {
    /// Replace unusable values with defaults, warning about each one
    ///
    /// Transfer amounts and account ids are left alone: they are checked when
    /// the transfer is dispatched and reported as a rejected phase.
    pub fn validated(mut self) -> Self {
        let default = Self::default();

        if self.accounts == 0 {
            warn!(
                "Invalid accounts ({}), using default ({})",
                self.accounts, default.accounts
            );
            self.accounts = default.accounts;
        }

        if self.operation_amount < 0 {
            warn!(
                "Negative operation amount ({}), using its magnitude",
                self.operation_amount
            );
            self.operation_amount = self.operation_amount.saturating_abs();
        }

        if self.retry.max_attempts == 0 {
            warn!(
                "Invalid max_attempts ({}), using default ({})",
                self.retry.max_attempts, default.retry.max_attempts
            );
            self.retry.max_attempts = default.retry.max_attempts;
        }

        if self.retry.backoff_min > self.retry.backoff_max {
            warn!(
                "Back-off range inverted ({:?} > {:?}), swapping bounds",
                self.retry.backoff_min, self.retry.backoff_max
            );
            std::mem::swap(&mut self.retry.backoff_min, &mut self.retry.backoff_max);
        }

        if self.naive.poll_interval.is_zero() {
            self.naive.poll_interval = default.naive.poll_interval;
        }

        self
    }

    /// Timing and protocol state handed to transfer workers of one phase
    ///
    /// Each call returns a fresh abandon signal and wait-for graph.
    pub fn transfer_env(&self) -> TransferEnv {
        TransferEnv {
            naive: self.naive,
            retry: self.retry,
            ..TransferEnv::default()
        }
    }
}
