//! Thread-safe in-memory account storage
//!
//! `InMemoryAccountStore` keeps account snapshots in a `DashMap`. It does not
//! coordinate transactions itself: the executor holds the lock manager's
//! account locks around every load/save, and the map only guarantees that each
//! individual read or write is not torn.
//!
//! # Consistency
//!
//! [`AccountStore::all_accounts`] reads entries one by one. Taken while
//! transactions are in flight, it may observe one side of a transfer before
//! the other. Call it after `TransactionService::wait_for_all_transactions`
//! for a consistent checkpoint.

use dashmap::DashMap;
use rust_decimal::Decimal;

use super::traits::AccountStore;
use crate::types::{Account, AccountId, BankError};

/// Account store backed by a concurrent hash map
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<AccountId, Account>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Create a store pre-populated with `accounts`
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        for account in accounts {
            store.insert(account);
        }
        store
    }

    /// Add or replace an account outside of transaction processing (seeding)
    pub fn insert(&self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Current balance of one account, if it exists
    pub fn balance(&self, id: AccountId) -> Option<Decimal> {
        self.accounts.get(&id).map(|account| account.balance)
    }

    /// Sum of all balances, bank included
    pub fn total_balance(&self) -> Decimal {
        self.accounts
            .iter()
            .map(|entry| entry.value().balance)
            .sum()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn load(&self, id: AccountId) -> Result<Account, BankError> {
        self.accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BankError::account_not_found(id))
    }

    fn save(&self, account: &Account) -> Result<(), BankError> {
        self.accounts.insert(account.id, account.clone());
        Ok(())
    }

    fn save_all(&self, accounts: &[Account]) -> Result<(), BankError> {
        // Every account written here is locked by the caller, so no other
        // executor can interleave between the inserts.
        for account in accounts {
            self.accounts.insert(account.id, account.clone());
        }
        Ok(())
    }

    fn all_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }
}
