//! Phase outcomes and the overall simulation report

use crate::core::TransferOutcome;
use crate::types::{AccountId, AccountSnapshot, Balance, SimulationError, WorkerId};

/// The four scenario phases, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PhaseKind {
    /// Unsynchronized deposit/withdraw on one account
    Race,
    /// Synchronized deposit/withdraw pairs on every account
    Mutex,
    /// Opposite naive transfers between two accounts
    Deadlock,
    /// Opposite ordered transfers between the same two accounts
    Avoidance,
}

impl PhaseKind {
    /// Position in the full run, starting at 1
    pub fn number(&self) -> u8 {
        match self {
            PhaseKind::Race => 1,
            PhaseKind::Mutex => 2,
            PhaseKind::Deadlock => 3,
            PhaseKind::Avoidance => 4,
        }
    }

    /// Short machine-friendly name
    pub fn name(&self) -> &'static str {
        match self {
            PhaseKind::Race => "race",
            PhaseKind::Mutex => "mutex",
            PhaseKind::Deadlock => "deadlock",
            PhaseKind::Avoidance => "avoidance",
        }
    }

    /// Heading used in progress output
    pub fn title(&self) -> &'static str {
        match self {
            PhaseKind::Race => "Basic Thread Operations (No Mutex)",
            PhaseKind::Mutex => "Resource Protection (Using Mutexes)",
            PhaseKind::Deadlock => "Deadlock Creation",
            PhaseKind::Avoidance => "Deadlock Resolution",
        }
    }
}

/// How a phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    /// Every checked invariant held
    Passed,
    /// An expected hazard showed up and was reported (lost update, deadlock, aborted transfer)
    Observed,
    /// A checked invariant was violated
    Failed,
    /// A request failed validation and no worker was started
    Rejected,
}

impl PhaseStatus {
    /// Lowercase label for reports
    pub fn label(&self) -> &'static str {
        match self {
            PhaseStatus::Passed => "passed",
            PhaseStatus::Observed => "observed",
            PhaseStatus::Failed => "failed",
            PhaseStatus::Rejected => "rejected",
        }
    }
}

/// What a phase measured
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutcome {
    /// Race phase result
    Race {
        /// Account both workers hit
        account: AccountId,
        /// Balance under sequential semantics
        expected: Balance,
        /// Balance after both workers joined
        observed: Balance,
    },

    /// Mutex phase result
    Mutex {
        /// Balance every account was reset to
        starting_balance: Balance,
        /// Balances after all workers joined
        balances: Vec<AccountSnapshot>,
        /// Store-wide sum before the phase
        expected_total: Balance,
        /// Store-wide sum after the phase
        total: Balance,
    },

    /// Deadlock phase result
    Deadlock {
        /// Workers on the circular wait, if one was seen
        cycle: Option<Vec<WorkerId>>,
        /// How each naive transfer ended
        transfers: Vec<TransferOutcome>,
        /// Accounts whose locks were reinitialized
        recovered: Vec<AccountId>,
        /// Accounts whose lock was still held when reinitialized
        stale_locks: Vec<AccountId>,
        /// Combined balance of the two accounts before the phase
        before_total: Balance,
        /// Combined balance of the two accounts after recovery
        after_total: Balance,
    },

    /// Avoidance phase result
    Avoidance {
        /// How each ordered transfer ended
        transfers: Vec<TransferOutcome>,
        /// Combined balance of the two accounts before the phase
        before_total: Balance,
        /// Combined balance of the two accounts after the phase
        after_total: Balance,
        /// Final balances of the two accounts
        balances: Vec<AccountSnapshot>,
    },

    /// Phase whose requests failed validation
    Rejected {
        /// The phase that was rejected
        phase: PhaseKind,
        /// The validation error
        error: SimulationError,
    },
}

impl PhaseOutcome {
    /// Which phase produced this outcome
    pub fn kind(&self) -> PhaseKind {
        match self {
            PhaseOutcome::Race { .. } => PhaseKind::Race,
            PhaseOutcome::Mutex { .. } => PhaseKind::Mutex,
            PhaseOutcome::Deadlock { .. } => PhaseKind::Deadlock,
            PhaseOutcome::Avoidance { .. } => PhaseKind::Avoidance,
            PhaseOutcome::Rejected { phase, .. } => *phase,
        }
    }

    /// Verdict for this phase
    pub fn status(&self) -> PhaseStatus {
        match self {
            PhaseOutcome::Race {
                expected, observed, ..
            } => {
                if expected == observed {
                    PhaseStatus::Passed
                } else {
                    PhaseStatus::Observed
                }
            }
            PhaseOutcome::Mutex {
                starting_balance,
                balances,
                expected_total,
                total,
            } => {
                let unchanged = balances.iter().all(|s| s.balance == *starting_balance);
                if unchanged && total == expected_total {
                    PhaseStatus::Passed
                } else {
                    PhaseStatus::Failed
                }
            }
            PhaseOutcome::Deadlock {
                cycle,
                transfers,
                before_total,
                after_total,
                ..
            } => {
                if before_total != after_total || (cycle.is_none() && any_abandoned(transfers)) {
                    PhaseStatus::Failed
                } else if cycle.is_some() {
                    PhaseStatus::Observed
                } else {
                    PhaseStatus::Passed
                }
            }
            PhaseOutcome::Avoidance {
                transfers,
                before_total,
                after_total,
                ..
            } => {
                if before_total != after_total {
                    PhaseStatus::Failed
                } else if transfers.iter().all(TransferOutcome::is_completed) {
                    PhaseStatus::Passed
                } else {
                    PhaseStatus::Observed
                }
            }
            PhaseOutcome::Rejected { .. } => PhaseStatus::Rejected,
        }
    }

    /// One-line human description
    pub fn detail(&self) -> String {
        match self {
            PhaseOutcome::Race {
                account,
                expected,
                observed,
            } => {
                if expected == observed {
                    format!("account {account} final balance {observed} (expected {expected}), no race observed")
                } else {
                    format!("race condition observed on account {account}: expected {expected}, got {observed}")
                }
            }
            PhaseOutcome::Mutex {
                balances,
                expected_total,
                total,
                starting_balance,
            } => {
                let wrong: Vec<String> = balances
                    .iter()
                    .filter(|s| s.balance != *starting_balance)
                    .map(|s| format!("account {}={}", s.account, s.balance))
                    .collect();
                if wrong.is_empty() && total == expected_total {
                    format!("all {} accounts at {starting_balance}, total {total}", balances.len())
                } else {
                    format!(
                        "total {total} (expected {expected_total}); incorrect: {}",
                        wrong.join(" ")
                    )
                }
            }
            PhaseOutcome::Deadlock {
                cycle,
                transfers,
                recovered,
                ..
            } => {
                let outcomes = labels(transfers);
                match cycle {
                    Some(workers) => format!(
                        "circular wait between workers {}; transfers {outcomes}; locks reinitialized on accounts {}",
                        join_ids(workers),
                        join_ids(recovered)
                    ),
                    None if any_abandoned(transfers) => format!(
                        "workers abandoned without a confirmed circular wait; transfers {outcomes}"
                    ),
                    None => format!("no circular wait observed; transfers {outcomes}"),
                }
            }
            PhaseOutcome::Avoidance {
                transfers,
                before_total,
                after_total,
                balances,
            } => {
                let finals: Vec<String> = balances
                    .iter()
                    .map(|s| format!("account {}={}", s.account, s.balance))
                    .collect();
                format!(
                    "transfers {}; {}; total {after_total} (expected {before_total})",
                    labels(transfers),
                    finals.join(" ")
                )
            }
            PhaseOutcome::Rejected { error, .. } => format!("rejected at dispatch: {error}"),
        }
    }
}

fn labels(transfers: &[TransferOutcome]) -> String {
    transfers
        .iter()
        .map(TransferOutcome::label)
        .collect::<Vec<_>>()
        .join("/")
}

fn any_abandoned(transfers: &[TransferOutcome]) -> bool {
    transfers
        .iter()
        .any(|outcome| matches!(outcome, TransferOutcome::Abandoned))
}

fn join_ids<T: ToString>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    /// One outcome per phase that ran, in run order
    pub phases: Vec<PhaseOutcome>,
    /// Account balances after the last phase
    pub final_balances: Vec<AccountSnapshot>,
}

impl SimulationReport {
    /// True unless some phase failed an invariant or was rejected
    ///
    /// An observed race, deadlock or aborted transfer does not count against
    /// the run.
    pub fn all_phases_succeeded(&self) -> bool {
        self.phases.iter().all(|phase| {
            !matches!(
                phase.status(),
                PhaseStatus::Failed | PhaseStatus::Rejected
            )
        })
    }

    /// Outcome of `kind`, if that phase ran
    pub fn phase(&self, kind: PhaseKind) -> Option<&PhaseOutcome> {
        self.phases.iter().find(|phase| phase.kind() == kind)
    }
}
