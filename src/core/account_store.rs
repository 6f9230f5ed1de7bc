//! Fixed-size store of independently lockable accounts
//!
//! The `AccountStore` is the only shared mutable state in the simulator. It is
//! created once, wrapped in an `Arc` and handed to every worker.
//!
//! # Locking
//!
//! Each [`Account`] carries its own `parking_lot::Mutex<()>`. Holding the lock
//! is represented by an [`AccountGuard`], which is the only way to read or
//! write the balance under the locking discipline. Dropping the guard releases
//! the lock on every exit path.
//!
//! The balance itself is an `AtomicI64` so that the race demonstration can
//! read and write it with no lock at all through
//! [`Account::balance_unsynchronized`] and [`Account::set_balance_unsynchronized`].
//! Those accessors are plain loads and stores: a read-modify-write built from
//! them loses updates under concurrency, which is exactly what the race phase
//! shows.
//!
//! # Exclusive Access
//!
//! Between phases the driver resets balances and, after the deadlock phase,
//! reinitializes locks. Those methods take `&mut self`, so they can only be
//! called once every worker has been joined and dropped its `Arc` clone.

use crate::types::{AccountId, AccountSnapshot, Balance, SimulationError};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{trace, warn};

/// A single lockable account
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    balance: AtomicI64,
    lock: Mutex<()>,
}

impl Account {
    fn new(id: AccountId, balance: Balance) -> Self {
        Account {
            id,
            balance: AtomicI64::new(balance),
            lock: Mutex::new(()),
        }
    }

    /// The account id
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Block until the account lock is acquired
    pub fn lock(&self) -> AccountGuard<'_> {
        AccountGuard::new(self, self.lock.lock())
    }

    /// Acquire the lock without blocking
    ///
    /// Returns `None` if another worker holds it.
    pub fn try_lock(&self) -> Option<AccountGuard<'_>> {
        self.lock.try_lock().map(|held| AccountGuard::new(self, held))
    }

    /// Wait at most `timeout` for the lock
    pub fn try_lock_for(&self, timeout: Duration) -> Option<AccountGuard<'_>> {
        self.lock
            .try_lock_for(timeout)
            .map(|held| AccountGuard::new(self, held))
    }

    /// Whether any worker currently holds the lock
    ///
    /// The answer may be stale by the time the caller looks at it.
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Read the balance without taking the lock
    ///
    /// The caller is responsible for synchronization. Only the race
    /// demonstration uses this on a shared account.
    pub fn balance_unsynchronized(&self) -> Balance {
        self.balance.load(Ordering::Relaxed)
    }

    /// Write the balance without taking the lock
    pub fn set_balance_unsynchronized(&self, balance: Balance) {
        self.balance.store(balance, Ordering::Relaxed);
    }
}

/// Proof that the holder owns an account's lock
///
/// Balance accessors on the guard are the synchronized path. The lock is
/// released when the guard is dropped or passed to [`AccountGuard::unlock`].
#[derive(Debug)]
pub struct AccountGuard<'a> {
    account: &'a Account,
    held: Option<MutexGuard<'a, ()>>,
}

impl<'a> AccountGuard<'a> {
    fn new(account: &'a Account, held: MutexGuard<'a, ()>) -> Self {
        trace!(account = account.id, "acquired lock");
        AccountGuard {
            account,
            held: Some(held),
        }
    }

    /// Id of the locked account
    pub fn id(&self) -> AccountId {
        self.account.id
    }

    /// Current balance
    pub fn balance(&self) -> Balance {
        self.account.balance.load(Ordering::Relaxed)
    }

    /// Overwrite the balance
    pub fn set_balance(&mut self, balance: Balance) {
        self.account.balance.store(balance, Ordering::Relaxed);
    }

    /// Add `amount` to the balance and return the new balance
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` and leaves the balance unchanged if the
    /// addition overflows.
    pub fn credit(&mut self, amount: Balance) -> Result<Balance, SimulationError> {
        let updated = self
            .balance()
            .checked_add(amount)
            .ok_or_else(|| SimulationError::arithmetic_overflow("credit", self.id()))?;
        self.set_balance(updated);
        Ok(updated)
    }

    /// Subtract `amount` from the balance and return the new balance
    pub fn debit(&mut self, amount: Balance) -> Result<Balance, SimulationError> {
        let updated = self
            .balance()
            .checked_sub(amount)
            .ok_or_else(|| SimulationError::arithmetic_overflow("debit", self.id()))?;
        self.set_balance(updated);
        Ok(updated)
    }

    /// Release the lock
    pub fn unlock(self) {
        drop(self);
    }
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        trace!(account = self.account.id, "released lock");
    }
}

/// Fixed collection of accounts indexed by id
#[derive(Debug)]
pub struct AccountStore {
    accounts: Vec<Account>,
}

impl AccountStore {
    /// Create `count` accounts, each starting at `initial_balance`
    ///
    /// # Errors
    ///
    /// Returns `EmptyStore` when `count` is zero.
    pub fn new(count: usize, initial_balance: Balance) -> Result<Self, SimulationError> {
        if count == 0 {
            return Err(SimulationError::EmptyStore);
        }
        let accounts = (0..count)
            .map(|id| Account::new(id, initial_balance))
            .collect();
        Ok(AccountStore { accounts })
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Always false for a constructed store, provided for API completeness
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Account by id
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range. Requests are validated before dispatch,
    /// so reaching this with a bad id is a programming error.
    pub fn get(&self, id: AccountId) -> &Account {
        &self.accounts[id]
    }

    /// Account by id, with the bounds check reported as an error
    pub fn try_get(&self, id: AccountId) -> Result<&Account, SimulationError> {
        self.accounts
            .get(id)
            .ok_or_else(|| SimulationError::invalid_account(id, self.accounts.len()))
    }

    /// Set every account to `balance`
    pub fn reset_all(&mut self, balance: Balance) {
        for account in &mut self.accounts {
            *account.balance.get_mut() = balance;
        }
    }

    /// Set one account to `balance`
    pub fn set_balance(&mut self, id: AccountId, balance: Balance) -> Result<(), SimulationError> {
        let len = self.accounts.len();
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| SimulationError::invalid_account(id, len))?;
        *account.balance.get_mut() = balance;
        Ok(())
    }

    /// Balance of one account, read under its lock
    pub fn balance(&self, id: AccountId) -> Result<Balance, SimulationError> {
        Ok(self.try_get(id)?.lock().balance())
    }

    /// Balances of every account, each read under its own lock
    pub fn snapshot(&self) -> Vec<AccountSnapshot> {
        self.accounts
            .iter()
            .map(|account| AccountSnapshot::new(account.id, account.lock().balance()))
            .collect()
    }

    /// Sum of all balances
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` naming the first account whose balance
    /// pushes the sum out of range.
    pub fn total(&self) -> Result<Balance, SimulationError> {
        sum_balances(&self.snapshot())
    }

    /// Destructive recovery: replace the locks of `ids` with fresh, unlocked locks
    ///
    /// This is an operational reset, not part of any locking protocol, and the
    /// ordered transfer never relies on it. It exists to clear lock state left
    /// behind by abandoned workers. Requiring `&mut self` means every worker
    /// that referenced the store has already been joined, so no guard can
    /// outlive the lock it borrowed from.
    ///
    /// Returns the ids whose lock was still marked as held before replacement.
    pub fn reinitialize_locks(
        &mut self,
        ids: &[AccountId],
    ) -> Result<Vec<AccountId>, SimulationError> {
        let len = self.accounts.len();
        if let Some(&bad) = ids.iter().find(|&&id| id >= len) {
            return Err(SimulationError::invalid_account(bad, len));
        }

        let mut stale = Vec::new();
        for &id in ids {
            let account = &mut self.accounts[id];
            if account.lock.is_locked() {
                stale.push(id);
            }
            account.lock = Mutex::new(());
            warn!(account = id, "lock reinitialized by destructive recovery");
        }
        Ok(stale)
    }
}

/// Checked sum of snapshot balances
///
/// # Errors
///
/// Returns `ArithmeticOverflow` naming the account whose balance overflows the sum.
pub fn sum_balances(snapshots: &[AccountSnapshot]) -> Result<Balance, SimulationError> {
    snapshots.iter().try_fold(0, |sum: Balance, snapshot| {
        sum.checked_add(snapshot.balance)
            .ok_or_else(|| SimulationError::arithmetic_overflow("total", snapshot.account))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_store_initializes_every_account() {
        let store = AccountStore::new(5, 100).unwrap();

        assert_eq!(store.len(), 5);
        for id in 0..5 {
            assert_eq!(store.get(id).id(), id);
            assert_eq!(store.balance(id).unwrap(), 100);
        }
        assert_eq!(store.total().unwrap(), 500);
    }

    #[test]
    fn test_new_store_rejects_zero_accounts() {
        assert_eq!(
            AccountStore::new(0, 100).unwrap_err(),
            SimulationError::EmptyStore
        );
    }

    #[test]
    #[should_panic]
    fn test_get_out_of_range_panics() {
        let store = AccountStore::new(2, 0).unwrap();
        let _ = store.get(2);
    }

    #[test]
    fn test_try_get_out_of_range_is_an_error() {
        let store = AccountStore::new(2, 0).unwrap();
        assert_eq!(
            store.try_get(3).unwrap_err(),
            SimulationError::invalid_account(3, 2)
        );
    }

    #[test]
    fn test_try_lock_fails_while_held() {
        let store = AccountStore::new(1, 0).unwrap();
        let account = store.get(0);

        let guard = account.lock();
        assert!(account.is_locked());
        assert!(account.try_lock().is_none());

        guard.unlock();
        assert!(!account.is_locked());
        assert!(account.try_lock().is_some());
    }

    #[test]
    fn test_try_lock_for_times_out_while_held() {
        let store = AccountStore::new(1, 0).unwrap();
        let account = store.get(0);

        let _guard = account.lock();
        assert!(account.try_lock_for(Duration::from_millis(5)).is_none());
    }

    #[rstest]
    #[case::credit(100, 30, 130)]
    #[case::credit_negative(100, -30, 70)]
    #[case::credit_zero(100, 0, 100)]
    fn test_guard_credit(#[case] start: Balance, #[case] amount: Balance, #[case] expected: Balance) {
        let store = AccountStore::new(1, start).unwrap();
        let mut guard = store.get(0).lock();

        assert_eq!(guard.credit(amount).unwrap(), expected);
        assert_eq!(guard.balance(), expected);
    }

    #[test]
    fn test_guard_overflow_leaves_balance_unchanged() {
        let store = AccountStore::new(2, Balance::MAX).unwrap();

        let mut guard = store.get(0).lock();
        assert_eq!(
            guard.credit(1).unwrap_err(),
            SimulationError::arithmetic_overflow("credit", 0)
        );
        assert_eq!(guard.balance(), Balance::MAX);
        drop(guard);

        let mut other = store.get(1).lock();
        other.set_balance(Balance::MIN);
        assert!(other.debit(1).is_err());
        assert_eq!(other.balance(), Balance::MIN);
    }

    #[test]
    fn test_reset_all_and_set_balance() {
        let mut store = AccountStore::new(3, 100).unwrap();

        store.reset_all(40);
        store.set_balance(2, 7).unwrap();

        assert_eq!(store.balance(0).unwrap(), 40);
        assert_eq!(store.balance(1).unwrap(), 40);
        assert_eq!(store.balance(2).unwrap(), 7);
        assert_eq!(store.total().unwrap(), 87);
        assert!(store.set_balance(3, 1).is_err());
    }

    #[test]
    fn test_snapshot_is_ordered_by_id() {
        let mut store = AccountStore::new(3, 0).unwrap();
        store.set_balance(1, 10).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(
            snapshot,
            vec![
                AccountSnapshot::new(0, 0),
                AccountSnapshot::new(1, 10),
                AccountSnapshot::new(2, 0),
            ]
        );
    }

    #[test]
    fn test_reinitialize_locks_clears_leaked_lock() {
        let mut store = AccountStore::new(2, 100).unwrap();

        // Simulate a worker that vanished while holding the lock.
        std::mem::forget(store.get(1).lock());
        assert!(store.get(1).is_locked());

        let stale = store.reinitialize_locks(&[0, 1]).unwrap();

        assert_eq!(stale, vec![1]);
        assert!(!store.get(0).is_locked());
        assert!(!store.get(1).is_locked());
        assert_eq!(store.balance(1).unwrap(), 100);
    }

    #[test]
    fn test_reinitialize_locks_rejects_bad_id_without_touching_others() {
        let mut store = AccountStore::new(2, 100).unwrap();
        std::mem::forget(store.get(0).lock());

        assert_eq!(
            store.reinitialize_locks(&[0, 9]).unwrap_err(),
            SimulationError::invalid_account(9, 2)
        );
        assert!(store.get(0).is_locked());
    }

    #[test]
    fn test_concurrent_guarded_increments_same_account() {
        let store = Arc::new(AccountStore::new(1, 0).unwrap());
        let mut handles = vec![];

        for _ in 0..50 {
            let store_clone = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let mut guard = store_clone.get(0).lock();
                guard.credit(2).unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.balance(0).unwrap(), 100);
    }

    #[test]
    fn test_exclusive_access_after_workers_join() {
        let mut store = Arc::new(AccountStore::new(2, 100).unwrap());

        let worker = {
            let store_clone = Arc::clone(&store);
            thread::spawn(move || {
                store_clone.get(0).lock().credit(1).unwrap();
            })
        };
        worker.join().unwrap();

        let exclusive = Arc::get_mut(&mut store).expect("all clones dropped");
        exclusive.reset_all(5);
        assert_eq!(store.total().unwrap(), 10);
    }

    #[rstest]
    #[case::fits(2, Ok(i64::MAX - 1))]
    #[case::overflows_at_third(5, Err(SimulationError::arithmetic_overflow("total", 2)))]
    fn test_total_is_checked(
        #[case] accounts: usize,
        #[case] expected: Result<Balance, SimulationError>,
    ) {
        let store = AccountStore::new(accounts, i64::MAX / 2).unwrap();
        assert_eq!(store.total(), expected);
    }

    #[test]
    fn test_total_of_negative_balances_is_checked() {
        let store = AccountStore::new(2, i64::MIN).unwrap();
        assert_eq!(
            store.total(),
            Err(SimulationError::arithmetic_overflow("total", 1))
        );
    }

    #[test]
    fn test_lock_is_free_once_guard_dropped() {
        let store = AccountStore::new(1, 0).unwrap();

        let guard = store.get(0).lock();
        assert!(store.get(0).is_locked());
        drop(guard);

        assert!(!store.get(0).is_locked());
        assert!(store.get(0).try_lock().is_some());
    }
}
