//! Bank Lock Simulator Library
//! # Overview
//!
//! This library simulates concurrent workers updating a fixed set of bank
//! accounts, to show what goes wrong without locking, what per-account locks
//! fix, how inconsistent lock order deadlocks, and how a global lock order with
//! try-lock, bounded retry and random back-off avoids it.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Identifiers, requests and the error type
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Shared state and worker-side logic:
//!   - [`core::account_store`] - Lockable accounts and scoped guards
//!   - [`core::operation`] - Unsynchronized and synchronized deposit/withdraw
//!   - [`core::transfer`] - Naive and ordered two-account transfers
//!   - [`core::wait_graph`] - Circular-wait detection
//! - [`scenario`] - The four phases and the driver that runs them
//! - [`io`] - CSV report output
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Phases
//!
//! 1. **Race**: unsynchronized deposit and withdraw on one account may lose an update
//! 2. **Mutex**: the same pair under the account lock always leaves balances unchanged
//! 3. **Deadlock**: opposite naive transfers each hold one lock and wait for the other
//! 4. **Avoidance**: opposite ordered transfers both complete and conserve funds
//!
//! # Example
//!
//! ```no_run
//! use bank_lock_sim::cli::PhaseSelection;
//! use bank_lock_sim::scenario::{ScenarioDriver, SimulationConfig};
//!
//! let mut driver = ScenarioDriver::new(SimulationConfig::default())?;
//! let report = driver.run(PhaseSelection::Avoidance)?;
//! assert!(report.all_phases_succeeded());
//! # Ok::<(), bank_lock_sim::SimulationError>(())
//! ```

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod scenario;
pub mod types;

pub use core::{AccountStore, TransferOutcome};
pub use io::{write_balances_csv, write_phase_summary_csv};
pub use scenario::{PhaseOutcome, ScenarioDriver, SimulationConfig, SimulationReport};
pub use types::{AccountId, AccountSnapshot, Balance, SimulationError, WorkerId};
