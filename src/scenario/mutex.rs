//! Phase 2: per-account locking
//!
//! Every account is reset, then gets one synchronized deposit and one
//! synchronized withdraw of the same amount, all running concurrently. With
//! the account lock held across read, delay and write, every account must end
//! where it started and the store-wide sum must hold.

use super::worker::dispatch_operations;
use super::{PhaseKind, PhaseOutcome, ScenarioContext, ScenarioPhase};
use crate::core::sum_balances;
use crate::types::{LockingMode, OperationRequest, SimulationError};
use tracing::{error, info};

/// Runs one synchronized deposit/withdraw pair per account
#[derive(Debug, Clone, Copy, Default)]
pub struct MutexPhase;

impl ScenarioPhase for MutexPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Mutex
    }

    fn run(&self, ctx: &mut ScenarioContext) -> Result<PhaseOutcome, SimulationError> {
        let initial = ctx.config().initial_balance;
        let amount = ctx.config().operation_amount;

        ctx.exclusive_store("mutex setup")?.reset_all(initial);
        let expected_total = ctx.store().total()?;

        let accounts = ctx.store().len();
        let mut requests = Vec::with_capacity(accounts * 2);
        for account in 0..accounts {
            for signed in [amount, -amount] {
                requests.push(OperationRequest::new(
                    ctx.next_worker(),
                    account,
                    signed,
                    LockingMode::Synchronized,
                ));
            }
        }
        info!(
            "{accounts} accounts reset to {initial}, running {} synchronized operations",
            requests.len()
        );

        dispatch_operations(ctx, &requests)?;

        let balances = ctx.store().snapshot();
        let total = sum_balances(&balances)?;

        for snapshot in balances.iter().filter(|s| s.balance != initial) {
            error!(
                "account {} has incorrect balance {} (expected {initial})",
                snapshot.account, snapshot.balance
            );
        }
        if total == expected_total {
            info!("all accounts verified, total {total}");
        } else {
            error!("store total {total} does not match expected {expected_total}");
        }

        Ok(PhaseOutcome::Mutex {
            starting_balance: initial,
            balances,
            expected_total,
            total,
        })
    }
}
