//! Phase 1: lost updates without locking
//!
//! Two workers run an unsynchronized deposit and withdraw of the same amount
//! on one account. Each reads the balance, waits, then writes back, so the
//! later write can discard the earlier one. Sequentially the balance would be
//! unchanged; a different final balance is reported as an observed race.

use super::worker::dispatch_operations;
use super::{PhaseKind, PhaseOutcome, ScenarioContext, ScenarioPhase};
use crate::types::{LockingMode, OperationRequest, SimulationError};
use tracing::{debug, info, warn};

const RACE_ACCOUNT: usize = 0;

/// Runs the unsynchronized deposit/withdraw pair
#[derive(Debug, Clone, Copy, Default)]
pub struct RacePhase;

impl ScenarioPhase for RacePhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Race
    }

    fn run(&self, ctx: &mut ScenarioContext) -> Result<PhaseOutcome, SimulationError> {
        let initial = ctx.config().initial_balance;
        let amount = ctx.config().operation_amount;

        let requests = [
            OperationRequest::new(
                ctx.next_worker(),
                RACE_ACCOUNT,
                amount,
                LockingMode::Unsynchronized,
            ),
            OperationRequest::new(
                ctx.next_worker(),
                RACE_ACCOUNT,
                -amount,
                LockingMode::Unsynchronized,
            ),
        ];
        for request in &requests {
            request.validate(ctx.store().len())?;
        }

        ctx.exclusive_store("race setup")?
            .set_balance(RACE_ACCOUNT, initial)?;
        info!(
            "account {RACE_ACCOUNT} starts at {initial}, running deposit and withdraw of {amount} without locks"
        );

        for report in dispatch_operations(ctx, &requests)? {
            debug!(
                worker = report.worker,
                before = report.before,
                after = report.after,
                "operation finished"
            );
        }

        let observed = ctx.store().balance(RACE_ACCOUNT)?;
        if observed == initial {
            info!(
                "final balance of account {RACE_ACCOUNT}: {observed} (expected {initial}), no race observed this run"
            );
        } else {
            warn!(
                "race condition detected: account {RACE_ACCOUNT} expected {initial}, got {observed}"
            );
        }

        Ok(PhaseOutcome::Race {
            account: RACE_ACCOUNT,
            expected: initial,
            observed,
        })
    }
}
