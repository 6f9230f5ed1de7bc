//! Error types for the bank-account simulator
//!
//! This module defines every error that can stop a worker from being
//! dispatched or a phase from completing.
//!
//! # Error Categories
//!
//! - **Configuration Errors**: Invalid account id, negative amounts, self transfers
//! - **Resource Errors**: Empty store, worker threads that cannot be spawned
//! - **Worker Errors**: Panicked workers, arithmetic overflow on a balance
//! - **Output Errors**: I/O and CSV failures while writing reports
//!
//! Expected outcomes of the demonstrations (a lost update in the race phase,
//! a deadlock in the naive phase, an aborted ordered transfer) are not errors.
//! They are reported through [`crate::scenario::PhaseOutcome`] instead.

use super::account::{AccountId, Balance, WorkerId};
use thiserror::Error;

/// Main error type for the simulator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Account id outside the store
    ///
    /// Raised at dispatch time, the offending worker is never started.
    #[error("Invalid account {account}: store holds {len} accounts")]
    InvalidAccount {
        /// The requested account id
        account: AccountId,
        /// Number of accounts in the store
        len: usize,
    },

    /// Transfer amount below zero
    #[error("Invalid transfer amount {amount}: amount must be non-negative")]
    NegativeAmount {
        /// The rejected amount
        amount: Balance,
    },

    /// Transfer whose source and destination are the same account
    #[error("Transfer from account {account} to itself is not allowed")]
    SelfTransfer {
        /// The account used on both sides
        account: AccountId,
    },

    /// The store was configured with no accounts
    #[error("Account store must hold at least one account")]
    EmptyStore,

    /// Balance arithmetic would overflow
    ///
    /// The operation is rejected and the balance stays untouched.
    #[error("Arithmetic overflow in {operation} on account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account id
        account: AccountId,
    },

    /// A worker thread could not be started
    #[error("Failed to spawn worker {worker}: {message}")]
    WorkerSpawn {
        /// Worker id
        worker: WorkerId,
        /// Description from the OS
        message: String,
    },

    /// A worker thread panicked before reporting an outcome
    #[error("Worker {worker} panicked")]
    WorkerPanicked {
        /// Worker id
        worker: WorkerId,
    },

    /// Exclusive access to the store was requested while a worker still holds a handle
    #[error("Account store is still shared with running workers ({operation})")]
    StoreShared {
        /// Operation that needed exclusive access
        operation: String,
    },

    /// I/O error while writing a report
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV serialization error while writing a report
    #[error("CSV error: {message}")]
    CsvError {
        /// Description of the CSV error
        message: String,
    },
}

impl From<std::io::Error> for SimulationError {
    fn from(error: std::io::Error) -> Self {
        SimulationError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for SimulationError {
    fn from(error: csv::Error) -> Self {
        SimulationError::CsvError {
            message: error.to_string(),
        }
    }
}

impl SimulationError {
    /// Create an InvalidAccount error
    pub fn invalid_account(account: AccountId, len: usize) -> Self {
        SimulationError::InvalidAccount { account, len }
    }

    /// Create a NegativeAmount error
    pub fn negative_amount(amount: Balance) -> Self {
        SimulationError::NegativeAmount { amount }
    }

    /// Create a SelfTransfer error
    pub fn self_transfer(account: AccountId) -> Self {
        SimulationError::SelfTransfer { account }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        SimulationError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create a WorkerSpawn error
    pub fn worker_spawn(worker: WorkerId, message: impl Into<String>) -> Self {
        SimulationError::WorkerSpawn {
            worker,
            message: message.into(),
        }
    }

    /// Create a WorkerPanicked error
    pub fn worker_panicked(worker: WorkerId) -> Self {
        SimulationError::WorkerPanicked { worker }
    }

    /// Create a StoreShared error
    pub fn store_shared(operation: &str) -> Self {
        SimulationError::StoreShared {
            operation: operation.to_string(),
        }
    }

    /// Whether this error was raised by request validation at dispatch time
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SimulationError::InvalidAccount { .. }
                | SimulationError::NegativeAmount { .. }
                | SimulationError::SelfTransfer { .. }
        )
    }
}
