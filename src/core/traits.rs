//! Persistence collaborator traits
//!
//! The engine does not own storage. It needs an [`AccountStore`] to read and
//! write balances and a [`TransactionStore`] to record transactions and hand
//! out the queue of pending ones. In-memory implementations live in
//! [`super::account_store`] and [`super::transaction_store`].

use crate::types::{
    Account, AccountId, BankError, FailureReason, Transaction, TransactionId, TransactionStatus,
};

/// Durable home of account balances
///
/// Callers of `save`/`save_all` hold the lock of every account they write, so
/// implementations only need each call to be atomic on its own.
pub trait AccountStore: Send + Sync {
    /// Load a snapshot of an account
    fn load(&self, id: AccountId) -> Result<Account, BankError>;

    /// Persist a single account
    fn save(&self, account: &Account) -> Result<(), BankError>;

    /// Persist several accounts as one atomic write
    fn save_all(&self, accounts: &[Account]) -> Result<(), BankError>;

    /// Snapshot of every account
    fn all_accounts(&self) -> Vec<Account>;
}

/// Record of transactions and their statuses
pub trait TransactionStore: Send + Sync {
    /// Insert a transaction under a fresh id
    ///
    /// A transaction whose id is already stored is rejected with
    /// `BankError::InvalidTransaction` and the stored record is left untouched.
    fn store(&self, transaction: Transaction) -> Result<(), BankError>;

    fn get(&self, id: TransactionId) -> Option<Transaction>;

    /// Advance a stored transaction's status
    ///
    /// `failure` is only recorded with `TransactionStatus::Failed`.
    fn update_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        failure: Option<FailureReason>,
    ) -> Result<(), BankError>;

    /// Claim a stored transaction for execution
    ///
    /// Returns `Ok(true)` for exactly one caller per transaction, and only
    /// while it is `New`. Later calls return `Ok(false)`.
    fn claim(&self, id: TransactionId) -> Result<bool, BankError>;

    /// Claim every unclaimed transaction still in `New`, in ascending id order
    ///
    /// A transaction is returned by at most one call, even when callers race.
    fn take_new(&self) -> Vec<Transaction>;
}
