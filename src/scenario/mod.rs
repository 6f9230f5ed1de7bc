//! Scenario phases and the driver that runs them
//!
//! Each phase is a [`ScenarioPhase`] that prepares account state, dispatches
//! its workers, joins every one of them and returns a [`PhaseOutcome`]. The
//! driver runs the selected phases strictly one after another, so no worker of
//! one phase can overlap the next.

use crate::cli::PhaseSelection;
use crate::core::AccountStore;
use crate::types::{AccountId, Balance, SimulationError, WorkerId};
use std::sync::Arc;

pub mod avoidance;
pub mod config;
pub mod deadlock;
pub mod driver;
pub mod mutex;
pub mod race;
pub mod report;
pub mod worker;

pub use avoidance::AvoidancePhase;
pub use config::SimulationConfig;
pub use deadlock::DeadlockPhase;
pub use driver::ScenarioDriver;
pub use mutex::MutexPhase;
pub use race::RacePhase;
pub use report::{PhaseKind, PhaseOutcome, PhaseStatus, SimulationReport};
pub use worker::WorkerSet;

/// State shared by the phases of one run
///
/// Holds the store every worker borrows through an `Arc`, and hands out
/// worker ids that stay unique across phases.
#[derive(Debug)]
pub struct ScenarioContext {
    store: Arc<AccountStore>,
    config: SimulationConfig,
    next_worker: WorkerId,
}

impl ScenarioContext {
    /// Build a store from `config`
    ///
    /// # Errors
    ///
    /// Returns `EmptyStore` when the configuration asks for no accounts.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let store = AccountStore::new(config.accounts, config.initial_balance)?;
        Ok(Self {
            store: Arc::new(store),
            config,
            next_worker: 1,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    /// A handle to give to a worker thread
    pub fn shared_store(&self) -> Arc<AccountStore> {
        Arc::clone(&self.store)
    }

    /// Mutable access to the store between phases
    ///
    /// # Errors
    ///
    /// Returns `StoreShared` if any worker handle is still alive, which means
    /// some worker was not joined.
    pub fn exclusive_store(&mut self, operation: &str) -> Result<&mut AccountStore, SimulationError> {
        Arc::get_mut(&mut self.store).ok_or_else(|| SimulationError::store_shared(operation))
    }

    /// Allocate the next worker id
    pub fn next_worker(&mut self) -> WorkerId {
        let worker = self.next_worker;
        self.next_worker += 1;
        worker
    }
}

/// Combined balance of two accounts, each read under its lock
pub(crate) fn pair_total(
    store: &AccountStore,
    a: AccountId,
    b: AccountId,
) -> Result<Balance, SimulationError> {
    store
        .balance(a)?
        .checked_add(store.balance(b)?)
        .ok_or_else(|| SimulationError::arithmetic_overflow("total", b))
}

/// One phase of the scenario
pub trait ScenarioPhase: Send + Sync {
    /// Which phase this is
    fn kind(&self) -> PhaseKind;

    /// Prepare state, run every worker to completion and report what happened
    ///
    /// # Errors
    ///
    /// Configuration errors (bad account id, negative amount, self transfer)
    /// are returned before any worker starts; the driver turns them into a
    /// rejected outcome. Any other error is fatal to the run.
    fn run(&self, ctx: &mut ScenarioContext) -> Result<PhaseOutcome, SimulationError>;
}

/// Create the phases named by `selection`, in run order
pub fn create_phases(selection: PhaseSelection) -> Vec<Box<dyn ScenarioPhase>> {
    match selection {
        PhaseSelection::All => vec![
            Box::new(RacePhase),
            Box::new(MutexPhase),
            Box::new(DeadlockPhase),
            Box::new(AvoidancePhase),
        ],
        PhaseSelection::Race => vec![Box::new(RacePhase)],
        PhaseSelection::Mutex => vec![Box::new(MutexPhase)],
        PhaseSelection::Deadlock => vec![Box::new(DeadlockPhase)],
        PhaseSelection::Avoidance => vec![Box::new(AvoidancePhase)],
    }
}
