//! Phase 4: the same opposite transfers under the global lock order

use super::worker::{collect_transfers, spawn_transfers};
use super::{pair_total, PhaseKind, PhaseOutcome, ScenarioContext, ScenarioPhase};
use crate::core::TransferOutcome;
use crate::types::{AccountSnapshot, SimulationError, TransferMode, TransferRequest};
use tracing::{error, info, warn};

/// Runs opposite ordered transfers and checks conservation
#[derive(Debug, Clone, Copy, Default)]
pub struct AvoidancePhase;

impl ScenarioPhase for AvoidancePhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Avoidance
    }

    fn run(&self, ctx: &mut ScenarioContext) -> Result<PhaseOutcome, SimulationError> {
        let config = ctx.config().clone();
        let (a, b) = config.transfer_accounts;

        let requests = [
            TransferRequest::new(ctx.next_worker(), a, b, config.forward_amount, TransferMode::Ordered),
            TransferRequest::new(ctx.next_worker(), b, a, config.reverse_amount, TransferMode::Ordered),
        ];
        for request in &requests {
            request.validate(ctx.store().len())?;
        }

        let store = ctx.exclusive_store("avoidance setup")?;
        store.set_balance(a, config.initial_balance)?;
        store.set_balance(b, config.initial_balance)?;
        let before_total = pair_total(ctx.store(), a, b)?;
        info!(
            "accounts {a} and {b} reset to {}, starting opposite transfers in global lock order",
            config.initial_balance
        );

        let workers = spawn_transfers(ctx, &requests, &config.transfer_env())?;
        let transfers = collect_transfers(workers)?;

        for (request, outcome) in requests.iter().zip(&transfers) {
            if let TransferOutcome::Aborted { attempts } = outcome {
                warn!(
                    worker = request.worker,
                    "transfer from account {} to {} aborted after {attempts} attempts",
                    request.from,
                    request.to
                );
            }
        }

        let store = ctx.store();
        let balances = vec![
            AccountSnapshot::new(a, store.balance(a)?),
            AccountSnapshot::new(b, store.balance(b)?),
        ];
        let after_total = pair_total(store, a, b)?;
        info!(
            "final balances: account {a}={}, account {b}={}",
            balances[0].balance, balances[1].balance
        );
        if after_total == before_total {
            info!("combined balance {after_total} conserved");
        } else {
            error!("combined balance {after_total} does not match expected {before_total}");
        }

        Ok(PhaseOutcome::Avoidance {
            transfers,
            before_total,
            after_total,
            balances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::fast_config;
    use super::*;
    use crate::core::RetryPolicy;
    use crate::scenario::{PhaseStatus, SimulationConfig};
    use rstest::rstest;
    use std::time::Duration;

    #[test]
    fn test_default_amounts_end_at_ninety_and_one_ten() {
        let mut ctx = ScenarioContext::new(fast_config()).unwrap();

        let outcome = AvoidancePhase.run(&mut ctx).unwrap();

        let PhaseOutcome::Avoidance {
            transfers,
            before_total,
            after_total,
            balances,
        } = &outcome
        else {
            panic!("expected avoidance outcome, got {:?}", outcome);
        };
        assert!(transfers.iter().all(TransferOutcome::is_completed));
        assert_eq!((*before_total, *after_total), (200, 200));
        assert_eq!(
            balances,
            &vec![AccountSnapshot::new(0, 90), AccountSnapshot::new(1, 110)]
        );
        assert_eq!(outcome.status(), PhaseStatus::Passed);
    }

    #[rstest]
    #[case::reversed_pair((1, 0), 30, 20, 90, 110)]
    #[case::distant_pair((4, 2), 5, 50, 145, 55)]
    #[case::zero_amounts((0, 1), 0, 0, 100, 100)]
    fn test_pairs_and_amounts(
        #[case] transfer_accounts: (usize, usize),
        #[case] forward_amount: i64,
        #[case] reverse_amount: i64,
        #[case] first_balance: i64,
        #[case] second_balance: i64,
    ) {
        let mut ctx = ScenarioContext::new(SimulationConfig {
            transfer_accounts,
            forward_amount,
            reverse_amount,
            ..fast_config()
        })
        .unwrap();

        let outcome = AvoidancePhase.run(&mut ctx).unwrap();

        let (a, b) = transfer_accounts;
        assert_eq!(outcome.status(), PhaseStatus::Passed);
        assert_eq!(ctx.store().balance(a).unwrap(), first_balance);
        assert_eq!(ctx.store().balance(b).unwrap(), second_balance);
    }

    #[test]
    fn test_outstanding_store_handle_blocks_reset() {
        let mut ctx = ScenarioContext::new(fast_config()).unwrap();
        let handle = ctx.shared_store();

        assert_eq!(
            AvoidancePhase.run(&mut ctx).unwrap_err(),
            SimulationError::store_shared("avoidance setup")
        );

        drop(handle);
        assert!(AvoidancePhase.run(&mut ctx).is_ok());
    }

    #[test]
    fn test_single_attempt_budget_still_conserves() {
        let mut ctx = ScenarioContext::new(SimulationConfig {
            retry: RetryPolicy {
                max_attempts: 1,
                backoff_min: Duration::ZERO,
                backoff_max: Duration::ZERO,
            },
            ..fast_config()
        })
        .unwrap();

        let outcome = AvoidancePhase.run(&mut ctx).unwrap();

        assert_ne!(outcome.status(), PhaseStatus::Failed);
        assert_eq!(ctx.store().total().unwrap(), 500);
    }
}
