//! Property tests for synchronized operations and ordered transfers

#[cfg(test)]
mod property_tests {
    use bank_lock_sim::core::{
        run_operation, run_ordered_transfer, AccountStore, RetryPolicy, TransferOutcome,
    };
    use bank_lock_sim::types::{LockingMode, OperationRequest, TransferMode, TransferRequest};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_min: Duration::from_micros(100),
            backoff_max: Duration::from_millis(1),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // Concurrent synchronized operations never lose an update
        #[test]
        fn test_synchronized_operations_sum(
            initial in -1_000i64..1_000,
            amounts in prop::collection::vec(-500i64..500, 1..16)
        ) {
            let store = Arc::new(AccountStore::new(1, initial).unwrap());

            let workers: Vec<_> = amounts
                .iter()
                .enumerate()
                .map(|(i, &amount)| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        let request =
                            OperationRequest::new(i as u32 + 1, 0, amount, LockingMode::Synchronized);
                        run_operation(&store, &request, Duration::ZERO).unwrap()
                    })
                })
                .collect();
            for worker in workers {
                worker.join().unwrap();
            }

            prop_assert_eq!(store.balance(0).unwrap(), initial + amounts.iter().sum::<i64>());
        }

        // A completed ordered transfer moves exactly `amount` and conserves the pair
        #[test]
        fn test_ordered_transfer_moves_exact_amount(
            accounts in 2usize..8,
            from_seed in 0usize..8,
            offset in 1usize..8,
            initial in 0i64..1_000,
            amount in 0i64..2_000
        ) {
            let from = from_seed % accounts;
            let to = (from + 1 + offset % (accounts - 1)) % accounts;
            prop_assume!(from != to);

            let store = AccountStore::new(accounts, initial).unwrap();
            let request = TransferRequest::new(1, from, to, amount, TransferMode::Ordered);

            let outcome = run_ordered_transfer(&store, &request, &quick_policy(5)).unwrap();

            prop_assert_eq!(
                outcome,
                TransferOutcome::Completed {
                    from_balance: initial - amount,
                    to_balance: initial + amount,
                    attempts: 1,
                }
            );
            prop_assert_eq!(store.balance(from).unwrap(), initial - amount);
            prop_assert_eq!(store.balance(to).unwrap(), initial + amount);
            prop_assert_eq!(store.total().unwrap(), initial * accounts as i64);
        }

        // Two opposite ordered transfers over one pair both finish and conserve funds
        #[test]
        fn test_opposite_ordered_transfers_terminate(
            forward in 0i64..500,
            reverse in 0i64..500,
            swap in any::<bool>()
        ) {
            let store = Arc::new(AccountStore::new(2, 1_000).unwrap());
            let (a, b) = if swap { (1, 0) } else { (0, 1) };

            let workers: Vec<_> = [(1, a, b, forward), (2, b, a, reverse)]
                .into_iter()
                .map(|(worker, from, to, amount)| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        let request = TransferRequest::new(worker, from, to, amount, TransferMode::Ordered);
                        run_ordered_transfer(&store, &request, &quick_policy(5)).unwrap()
                    })
                })
                .collect();
            let outcomes: Vec<TransferOutcome> =
                workers.into_iter().map(|w| w.join().unwrap()).collect();

            for outcome in &outcomes {
                let attempts = match outcome {
                    TransferOutcome::Completed { attempts, .. } | TransferOutcome::Aborted { attempts } => *attempts,
                    TransferOutcome::Abandoned => panic!("ordered transfer cannot be abandoned"),
                };
                prop_assert!(attempts >= 1 && attempts <= 5);
            }
            prop_assert_eq!(store.total().unwrap(), 2_000);

            let moved: i64 = outcomes
                .iter()
                .zip([forward, -reverse])
                .filter(|(outcome, _)| outcome.is_completed())
                .map(|(_, delta)| delta)
                .sum();
            prop_assert_eq!(store.balance(a).unwrap(), 1_000 - moved);
            prop_assert_eq!(store.balance(b).unwrap(), 1_000 + moved);
        }

        // An aborted ordered transfer leaves both balances untouched
        #[test]
        fn test_aborted_transfer_changes_nothing(
            initial in -1_000i64..1_000,
            amount in 0i64..1_000,
            max_attempts in 1u32..4,
            block_higher in any::<bool>()
        ) {
            let store = AccountStore::new(2, initial).unwrap();
            let request = TransferRequest::new(1, 0, 1, amount, TransferMode::Ordered);

            if block_higher {
                let _held = store.get(1).lock();
                let outcome = run_ordered_transfer(&store, &request, &quick_policy(max_attempts)).unwrap();
                prop_assert_eq!(outcome, TransferOutcome::Aborted { attempts: max_attempts });
            } else {
                let outcome = run_ordered_transfer(&store, &request, &quick_policy(0)).unwrap();
                prop_assert_eq!(outcome, TransferOutcome::Aborted { attempts: 0 });
            }

            prop_assert_eq!(store.balance(0).unwrap(), initial);
            prop_assert_eq!(store.balance(1).unwrap(), initial);
        }
    }
}
