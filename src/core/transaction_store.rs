//! Thread-safe in-memory transaction storage
//!
//! Records every submitted transaction and its status. Status updates go
//! through [`Transaction::set_status`], so the monotonic lifecycle is enforced
//! here as well as in the executor.
//!
//! Ids are unique: a second `store` under a known id is rejected. Each record
//! carries a claim flag, flipped under the map's entry lock, so exactly one
//! caller of `claim` or `take_new` ever hands a transaction to an executor.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::traits::TransactionStore;
use crate::types::{BankError, FailureReason, Transaction, TransactionId, TransactionStatus};

#[derive(Debug)]
struct Record {
    transaction: Transaction,
    claimed: bool,
}

/// Transaction store backed by a concurrent hash map
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    transactions: DashMap<TransactionId, Record>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Number of stored transactions currently in `status`
    pub fn count_with_status(&self, status: TransactionStatus) -> usize {
        self.transactions
            .iter()
            .filter(|entry| entry.value().transaction.status() == status)
            .count()
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn store(&self, transaction: Transaction) -> Result<(), BankError> {
        match self.transactions.entry(transaction.id) {
            Entry::Occupied(_) => Err(BankError::invalid_transaction(format!(
                "transaction {} is already stored",
                transaction.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Record {
                    transaction,
                    claimed: false,
                });
                Ok(())
            }
        }
    }

    fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.transactions
            .get(&id)
            .map(|entry| entry.value().transaction.clone())
    }

    fn update_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        failure: Option<FailureReason>,
    ) -> Result<(), BankError> {
        let mut entry = self
            .transactions
            .get_mut(&id)
            .ok_or(BankError::TransactionNotFound { tx: id })?;

        let transaction = &mut entry.value_mut().transaction;
        match (status, failure) {
            (TransactionStatus::Failed, Some(reason)) => transaction.fail(reason),
            _ => transaction.set_status(status),
        }
    }

    fn claim(&self, id: TransactionId) -> Result<bool, BankError> {
        let mut entry = self
            .transactions
            .get_mut(&id)
            .ok_or(BankError::TransactionNotFound { tx: id })?;

        let record = entry.value_mut();
        if record.claimed || record.transaction.status() != TransactionStatus::New {
            return Ok(false);
        }
        record.claimed = true;
        Ok(true)
    }

    fn take_new(&self) -> Vec<Transaction> {
        let mut pending: Vec<Transaction> = self
            .transactions
            .iter_mut()
            .filter_map(|mut entry| {
                let record = entry.value_mut();
                if record.claimed || record.transaction.status() != TransactionStatus::New {
                    return None;
                }
                record.claimed = true;
                Some(record.transaction.clone())
            })
            .collect();
        pending.sort_by_key(|tx| tx.id);
        pending
    }
}
