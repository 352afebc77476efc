//! Single-transaction execution state machine
//!
//! `TransactionExecutor` drives one transaction from `New` to a terminal
//! status:
//!
//! ```text
//! Created -> Locking -> Validating -> Executing -> Unlocking -> Terminal
//!               |           |             |
//!               +-----------+-------------+--> Unlocking -> Terminal (Failed)
//! ```
//!
//! # Guarantees
//!
//! - Balances are read and written only while every involved account is
//!   locked through the shared [`LockManager`]
//! - Accounts are persisted only when the strategy succeeded, so a failed
//!   transaction leaves balances untouched
//! - Locks are released on every path, including a panicking strategy
//! - The terminal status is published after the locks are released
//! - No error escapes: every failure ends as `Failed` with a [`FailureReason`]

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};

use super::lock_manager::LockManager;
use super::traits::{AccountStore, TransactionStore};
use crate::strategy::{AccountPair, StrategyRegistry};
use crate::types::{
    AccountId, BankError, FailureReason, Transaction, TransactionId, TransactionStatus,
    TransactionType,
};

/// Stage of the execution state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorPhase {
    Created,
    Locking,
    Validating,
    Executing,
    Unlocking,
    Terminal,
}

impl fmt::Display for ExecutorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutorPhase::Created => "CREATED",
            ExecutorPhase::Locking => "LOCKING",
            ExecutorPhase::Validating => "VALIDATING",
            ExecutorPhase::Executing => "EXECUTING",
            ExecutorPhase::Unlocking => "UNLOCKING",
            ExecutorPhase::Terminal => "TERMINAL",
        };
        f.write_str(name)
    }
}

/// Final state of one executed transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    pub id: TransactionId,
    pub kind: TransactionType,

    /// `Done` or `Failed`
    pub status: TransactionStatus,

    /// Set when `status` is `Failed`
    pub failure: Option<FailureReason>,

    /// Accounts locked for the transaction, in acquisition order
    pub locked_accounts: Vec<AccountId>,

    /// When the last lock was acquired
    pub locked_at: Option<Instant>,

    /// Taken just before the locks were released
    pub unlocked_at: Option<Instant>,
}

impl TransactionOutcome {
    fn new(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id,
            kind: transaction.kind,
            status: transaction.status(),
            failure: transaction.failure(),
            locked_accounts: Vec::new(),
            locked_at: None,
            unlocked_at: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TransactionStatus::Done
    }

    pub fn is_failed(&self) -> bool {
        self.status == TransactionStatus::Failed
    }
}

/// Runs transactions against shared stores under the lock manager
///
/// Cheap to share: every collaborator is behind an `Arc`.
pub struct TransactionExecutor {
    accounts: Arc<dyn AccountStore>,
    transactions: Arc<dyn TransactionStore>,
    locks: Arc<LockManager>,
    strategies: Arc<StrategyRegistry>,
}

impl fmt::Debug for TransactionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionExecutor")
            .field("locks", &self.locks)
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

impl TransactionExecutor {
    /// Create a new TransactionExecutor
    ///
    /// # Arguments
    ///
    /// * `accounts` - Store the balances are loaded from and saved to
    /// * `transactions` - Store receiving every status change
    /// * `locks` - Lock manager shared by every executor of the service
    /// * `strategies` - Strategy lookup by transaction type
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        transactions: Arc<dyn TransactionStore>,
        locks: Arc<LockManager>,
        strategies: Arc<StrategyRegistry>,
    ) -> Self {
        Self {
            accounts,
            transactions,
            locks,
            strategies,
        }
    }

    /// Execute `transaction` to completion
    ///
    /// The transaction must already be in the transaction store. A transaction
    /// that is not `New` is returned untouched.
    pub async fn execute(&self, mut transaction: Transaction) -> TransactionOutcome {
        let mut phase = ExecutorPhase::Created;

        if transaction.status() != TransactionStatus::New {
            warn!(
                "Transaction {} is already {}, skipping",
                transaction.id,
                transaction.status()
            );
            return TransactionOutcome::new(&transaction);
        }

        advance(&mut phase, ExecutorPhase::Locking, transaction.id);
        let locks = match self
            .locks
            .lock_accounts(transaction.source, transaction.destination)
            .await
        {
            Ok(locks) => locks,
            Err(e) => {
                warn!("Transaction {}: {}", transaction.id, e);
                advance(&mut phase, ExecutorPhase::Terminal, transaction.id);
                return self.finish(transaction, Err(e.failure_reason()));
            }
        };
        let locked_accounts = locks.held_ids();
        let locked_at = Instant::now();

        let result = self.run_locked(&mut transaction, &mut phase);

        advance(&mut phase, ExecutorPhase::Unlocking, transaction.id);
        let unlocked_at = Instant::now();
        self.locks.unlock_accounts(locks);

        advance(&mut phase, ExecutorPhase::Terminal, transaction.id);
        let mut outcome = self.finish(transaction, result);
        outcome.locked_accounts = locked_accounts;
        outcome.locked_at = Some(locked_at);
        outcome.unlocked_at = Some(unlocked_at);
        outcome
    }

    /// Everything that happens while the accounts are locked
    fn run_locked(
        &self,
        transaction: &mut Transaction,
        phase: &mut ExecutorPhase,
    ) -> Result<(), FailureReason> {
        self.publish(transaction, TransactionStatus::Pending, None)
            .map_err(|e| {
                error!("Transaction {}: cannot mark pending: {}", transaction.id, e);
                FailureReason::Persistence
            })?;

        let mut accounts = self.load_accounts(transaction).map_err(|e| {
            warn!("Transaction {}: {}", transaction.id, e);
            e.failure_reason()
        })?;

        advance(phase, ExecutorPhase::Validating, transaction.id);
        if !transaction.is_transaction_possible(accounts.source.as_ref()) {
            warn!(
                "Transaction {}: insufficient funds in account {:?} for {}",
                transaction.id, transaction.source, transaction.amount
            );
            return Err(FailureReason::InsufficientFunds);
        }

        advance(phase, ExecutorPhase::Executing, transaction.id);
        let strategies = &self.strategies;
        let tx: &Transaction = transaction;
        let executed =
            panic::catch_unwind(AssertUnwindSafe(|| tx.execute(strategies, &mut accounts)));

        match executed {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return Err(reason),
            Err(_) => {
                error!("Transaction {}: strategy panicked", transaction.id);
                return Err(FailureReason::Execution);
            }
        }

        self.accounts
            .save_all(&accounts.into_accounts())
            .map_err(|e| {
                error!("Transaction {}: {}", transaction.id, e);
                FailureReason::Persistence
            })
    }

    fn load_accounts(&self, transaction: &Transaction) -> Result<AccountPair, BankError> {
        let source = transaction
            .source
            .map(|id| self.accounts.load(id))
            .transpose()?;
        let destination = transaction
            .destination
            .map(|id| self.accounts.load(id))
            .transpose()?;
        Ok(AccountPair::new(source, destination))
    }

    /// Apply a status change locally and push it to the transaction store
    fn publish(
        &self,
        transaction: &mut Transaction,
        status: TransactionStatus,
        failure: Option<FailureReason>,
    ) -> Result<(), BankError> {
        match failure {
            Some(reason) => transaction.fail(reason)?,
            None => transaction.set_status(status)?,
        }
        self.transactions
            .update_status(transaction.id, status, failure)
    }

    fn finish(
        &self,
        mut transaction: Transaction,
        result: Result<(), FailureReason>,
    ) -> TransactionOutcome {
        let published = match result {
            Ok(()) => self.publish(&mut transaction, TransactionStatus::Done, None),
            Err(reason) => self.publish(&mut transaction, TransactionStatus::Failed, Some(reason)),
        };
        if let Err(e) = published {
            error!(
                "Transaction {}: cannot publish terminal status: {}",
                transaction.id, e
            );
        }

        match transaction.failure() {
            None => info!(
                "Transaction {} ({}) completed: {}",
                transaction.id,
                transaction.kind,
                transaction.status()
            ),
            Some(reason) => warn!(
                "Transaction {} ({}) failed: {}",
                transaction.id, transaction.kind, reason
            ),
        }

        TransactionOutcome::new(&transaction)
    }
}

fn advance(phase: &mut ExecutorPhase, next: ExecutorPhase, id: TransactionId) {
    debug!("Transaction {}: {} -> {}", id, phase, next);
    *phase = next;
}
