//! Worker request types
//!
//! Requests are built by the scenario driver before a worker is spawned and
//! moved into that worker. They are never mutated afterwards.

use super::account::{AccountId, Balance, WorkerId};
use super::error::SimulationError;

/// Whether an operation takes the account lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockingMode {
    /// Read-modify-write without any lock (race demonstration)
    Unsynchronized,

    /// Read-modify-write while holding the account lock
    Synchronized,
}

/// A single deposit or withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRequest {
    /// Worker that executes the request
    pub worker: WorkerId,

    /// Target account
    pub account: AccountId,

    /// Signed amount: positive deposits, negative withdraws
    pub amount: Balance,

    /// Lock discipline for the critical section
    pub locking: LockingMode,
}

impl OperationRequest {
    /// Create a new operation request
    pub fn new(worker: WorkerId, account: AccountId, amount: Balance, locking: LockingMode) -> Self {
        OperationRequest {
            worker,
            account,
            amount,
            locking,
        }
    }

    /// Human-readable operation name for diagnostics
    pub fn kind(&self) -> &'static str {
        if self.amount >= 0 {
            "deposit"
        } else {
            "withdraw"
        }
    }

    /// Check the request against a store of `len` accounts
    pub fn validate(&self, len: usize) -> Result<(), SimulationError> {
        if self.account >= len {
            return Err(SimulationError::invalid_account(self.account, len));
        }
        Ok(())
    }
}

/// Lock protocol used by a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Lock `from` then `to` in caller order. Deadlock-prone.
    Naive,

    /// Canonical lock order with try-lock, retry and back-off
    Ordered,
}

/// A move of funds between two accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    /// Worker that executes the request
    pub worker: WorkerId,

    /// Account debited
    pub from: AccountId,

    /// Account credited
    pub to: AccountId,

    /// Non-negative amount moved
    pub amount: Balance,

    /// Lock protocol
    pub mode: TransferMode,
}

impl TransferRequest {
    /// Create a new transfer request
    pub fn new(
        worker: WorkerId,
        from: AccountId,
        to: AccountId,
        amount: Balance,
        mode: TransferMode,
    ) -> Self {
        TransferRequest {
            worker,
            from,
            to,
            amount,
            mode,
        }
    }

    /// The pair of accounts in global lock order: `(min, max)`
    pub fn lock_order(&self) -> (AccountId, AccountId) {
        if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        }
    }

    /// Check the request against a store of `len` accounts
    ///
    /// Rejects out-of-range ids, negative amounts and transfers from an
    /// account to itself.
    pub fn validate(&self, len: usize) -> Result<(), SimulationError> {
        for account in [self.from, self.to] {
            if account >= len {
                return Err(SimulationError::invalid_account(account, len));
            }
        }
        if self.amount < 0 {
            return Err(SimulationError::negative_amount(self.amount));
        }
        if self.from == self.to {
            return Err(SimulationError::self_transfer(self.from));
        }
        Ok(())
    }
}
