//! Deadlock-avoiding transfer: global lock order, try-lock, retry, back-off
//!
//! # Algorithm
//!
//! The pair `(first, second) = (min(from, to), max(from, to))` does not depend
//! on the transfer direction. For up to `max_attempts` attempts:
//!
//! 1. Block on `first`.
//! 2. Try `second` without blocking. On failure release `first`, sleep a
//!    random back-off and start the next attempt.
//! 3. With both held, debit `from` and credit `to`.
//! 4. Release `second`, then `first`.
//!
//! If no attempt holds both locks the transfer is aborted with no mutation.
//!
//! # Guarantees
//!
//! Every worker acquires shared accounts in ascending id order, so no set of
//! workers can form a circular wait. The random back-off makes repeated
//! collisions between retrying workers unlikely; it mitigates livelock but
//! does not guarantee progress, which is why the retry budget exists.

use super::super::account_store::AccountStore;
use super::super::pause;
use super::{apply_transfer, TransferOutcome};
use crate::types::{SimulationError, TransferRequest};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry budget and back-off range for ordered transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum lock attempts before the transfer is aborted
    pub max_attempts: u32,
    /// Shortest back-off after a failed attempt
    pub backoff_min: Duration,
    /// Longest back-off after a failed attempt
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_min: Duration::from_millis(100),
            backoff_max: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Draw a back-off uniformly from `[backoff_min, backoff_max]`
    ///
    /// Bounds beyond `u64::MAX` microseconds saturate there.
    pub fn backoff<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let low = saturating_micros(self.backoff_min.min(self.backoff_max));
        let high = saturating_micros(self.backoff_min.max(self.backoff_max));
        Duration::from_micros(rng.gen_range(low..=high))
    }
}

fn saturating_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Transfer funds using the global lock order
pub fn run_ordered_transfer(
    store: &AccountStore,
    request: &TransferRequest,
    policy: &RetryPolicy,
) -> Result<TransferOutcome, SimulationError> {
    info!(
        amount = request.amount,
        from = request.from,
        to = request.to,
        "transfer starting"
    );

    let (first_id, second_id) = request.lock_order();
    let first = store.get(first_id);
    let second = store.get(second_id);
    let mut rng = rand::thread_rng();

    // A failed attempt always releases `first`, so each attempt starts with
    // no lock held.
    let mut attempts = 0;
    let mut held = None;
    while attempts < policy.max_attempts {
        attempts += 1;

        let first_guard = first.lock();
        info!("locked account {first_id} (first lock)");

        match second.try_lock() {
            Some(second_guard) => {
                info!("locked account {second_id} (second lock)");
                held = Some((first_guard, second_guard));
                break;
            }
            None => {
                warn!(
                    attempt = attempts,
                    "could not lock account {second_id} (held by another worker), releasing account {first_id}"
                );
                first_guard.unlock();
                if attempts < policy.max_attempts {
                    let wait = policy.backoff(&mut rng);
                    debug!(backoff_ms = wait.as_millis() as u64, "backing off before retry");
                    pause(wait);
                }
            }
        }
    }

    let Some((mut first_guard, mut second_guard)) = held else {
        warn!(attempts, "transfer aborted to avoid deadlock, no funds moved");
        return Ok(TransferOutcome::Aborted { attempts });
    };

    let result = if request.from == first_id {
        apply_transfer(&mut first_guard, &mut second_guard, request.amount)
    } else {
        apply_transfer(&mut second_guard, &mut first_guard, request.amount)
    };

    second_guard.unlock();
    first_guard.unlock();

    let (from_balance, to_balance) = result?;
    info!(
        amount = request.amount,
        attempts,
        "transferred from account {} to {} (new balances: {}, {}), locks released",
        request.from,
        request.to,
        from_balance,
        to_balance
    );

    Ok(TransferOutcome::Completed {
        from_balance,
        to_balance,
        attempts,
    })
}
