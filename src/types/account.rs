//! Account-related types for the simulator
//!
//! The lockable account itself lives in [`crate::core::account_store`]; this
//! module only holds identifiers and the plain snapshot used for reporting.

use serde::Serialize;

/// Account identifier
///
/// Doubles as the account's index in the store and as its position in the
/// global lock order.
pub type AccountId = usize;

/// Worker identifier used in diagnostics
pub type WorkerId = u32;

/// Account balance in whole currency units
pub type Balance = i64;

/// Point-in-time view of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    /// The account id
    pub account: AccountId,

    /// Balance observed when the snapshot was taken
    pub balance: Balance,
}

impl AccountSnapshot {
    /// Create a snapshot from an id and balance
    pub fn new(account: AccountId, balance: Balance) -> Self {
        AccountSnapshot { account, balance }
    }
}
