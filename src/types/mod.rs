//! Types module
//!
//! Contains core data structures used throughout the simulator.
//! This module organizes types into logical submodules:
//! - `account`: Identifiers and account snapshots
//! - `request`: Operation and transfer requests handed to workers
//! - `error`: Error types for the simulator

pub mod account;
pub mod error;
pub mod request;

pub use account::{AccountId, AccountSnapshot, Balance, WorkerId};
pub use error::SimulationError;
pub use request::{LockingMode, OperationRequest, TransferMode, TransferRequest};
