//! Transaction submission and the worker pool
//!
//! `TransactionService` owns a dedicated multi-threaded tokio runtime whose
//! worker threads are the pool transactions execute on. Every registered
//! transaction becomes its own task; tasks touching disjoint accounts run in
//! parallel and tasks sharing an account serialize on that account's lock.
//!
//! # Architecture
//!
//! ```text
//! TransactionService
//!     ├── Runtime                        (config.workers worker threads)
//!     ├── Arc<TransactionExecutor>       (shared by every task)
//!     │     ├── Arc<dyn AccountStore>
//!     │     ├── Arc<dyn TransactionStore>
//!     │     ├── Arc<LockManager>
//!     │     └── Arc<StrategyRegistry>
//!     └── Mutex<Vec<JoinHandle>>         (tasks not yet waited for)
//! ```
//!
//! # Blocking
//!
//! [`TransactionService::wait_for_all_transactions`] blocks the calling thread
//! on the runtime. It must be called from outside any tokio runtime.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use log::{debug, error, info};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use super::executor::{TransactionExecutor, TransactionOutcome};
use super::lock_manager::LockManager;
use super::traits::{AccountStore, TransactionStore};
use crate::config::ServiceConfig;
use crate::strategy::StrategyRegistry;
use crate::types::{
    Account, BankError, Transaction, TransactionBuilder, TransactionCategory, TransactionId,
    TransactionStatus, TransactionType,
};

/// Summary of the transactions completed by one barrier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub done: usize,
    pub failed: usize,

    /// One entry per task that ran to completion, in submission order
    pub outcomes: Vec<TransactionOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.done + self.failed
    }
}

/// Front door of the engine: accepts transactions and runs them on the pool
pub struct TransactionService {
    config: ServiceConfig,
    runtime: Runtime,
    executor: Arc<TransactionExecutor>,
    locks: Arc<LockManager>,
    accounts: Arc<dyn AccountStore>,
    transactions: Arc<dyn TransactionStore>,
    pending: Mutex<Vec<JoinHandle<TransactionOutcome>>>,
}

impl std::fmt::Debug for TransactionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionService")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl TransactionService {
    /// Create a service with the default strategy for every transaction type
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count and locking policy
    /// * `accounts` - Account store the transactions operate on
    /// * `transactions` - Store recording every transaction and its status
    ///
    /// # Returns
    ///
    /// * `Ok(TransactionService)` with its worker pool started
    /// * `Err(BankError::Runtime)` if the runtime could not be built
    pub fn new(
        config: ServiceConfig,
        accounts: Arc<dyn AccountStore>,
        transactions: Arc<dyn TransactionStore>,
    ) -> Result<Self, BankError> {
        Self::with_strategies(config, accounts, transactions, StrategyRegistry::default())
    }

    /// Create a service with a custom strategy registry
    pub fn with_strategies(
        config: ServiceConfig,
        accounts: Arc<dyn AccountStore>,
        transactions: Arc<dyn TransactionStore>,
        strategies: StrategyRegistry,
    ) -> Result<Self, BankError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.workers)
            .thread_name("bank-worker")
            .enable_time()
            .build()
            .map_err(|e| BankError::runtime(format!("Failed to create tokio runtime: {}", e)))?;

        let locks = Arc::new(LockManager::new(config.locking));
        let executor = Arc::new(TransactionExecutor::new(
            Arc::clone(&accounts),
            Arc::clone(&transactions),
            Arc::clone(&locks),
            Arc::new(strategies),
        ));

        debug!("Transaction service started with {} workers", config.workers);

        Ok(Self {
            config,
            runtime,
            executor,
            locks,
            accounts,
            transactions,
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Submit a transaction for asynchronous execution
    ///
    /// The transaction is stored, claimed, then spawned on the pool. It runs
    /// independently of every other submission. If a concurrent
    /// [`Self::process_all_new_transactions`] claimed it first, that call
    /// spawns it instead.
    ///
    /// # Errors
    ///
    /// * `BankError::InvalidTransaction` if the transaction is not `New` or
    ///   its id is already stored
    /// * Any other error the transaction store reports while storing it
    pub fn register_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<TransactionId, BankError> {
        if transaction.status() != TransactionStatus::New {
            return Err(BankError::invalid_transaction(format!(
                "transaction {} is {}, only NEW transactions can be registered",
                transaction.id,
                transaction.status()
            )));
        }

        let id = transaction.id;
        self.transactions.store(transaction.clone())?;

        if self.transactions.claim(id)? {
            self.spawn(transaction);
            debug!("Registered transaction {}", id);
        } else {
            debug!("Transaction {} was claimed by another submitter", id);
        }
        Ok(id)
    }

    fn spawn(&self, transaction: Transaction) {
        let executor = Arc::clone(&self.executor);
        let handle = self
            .runtime
            .spawn(async move { executor.execute(transaction).await });

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Block until every submitted transaction reached a terminal status
    ///
    /// Transactions registered while waiting are waited for as well. The pool
    /// stays up, so this can be called again after further submissions.
    pub fn wait_for_all_transactions(&self) -> BatchReport {
        let mut report = BatchReport::default();

        loop {
            let handles = std::mem::take(
                &mut *self
                    .pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            if handles.is_empty() {
                break;
            }

            for joined in self.runtime.block_on(join_all(handles)) {
                match joined {
                    Ok(outcome) => {
                        if outcome.is_done() {
                            report.done += 1;
                        } else {
                            report.failed += 1;
                        }
                        report.outcomes.push(outcome);
                    }
                    Err(e) => {
                        error!("Transaction task did not complete: {}", e);
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            "Batch finished: {} done, {} failed",
            report.done, report.failed
        );
        report
    }

    /// Submit every unclaimed transaction still `New` in the transaction store
    ///
    /// Transactions are claimed as they are taken, so repeated or concurrent
    /// calls never submit the same transaction twice.
    ///
    /// # Returns
    ///
    /// The ids that were submitted, in ascending order.
    pub fn process_all_new_transactions(&self) -> Vec<TransactionId> {
        let queued = self.transactions.take_new();
        debug!("Processing {} queued transactions", queued.len());

        queued
            .into_iter()
            .map(|transaction| {
                let id = transaction.id;
                self.spawn(transaction);
                id
            })
            .collect()
    }

    /// Build and register `count` random transactions of one type
    ///
    /// Accounts are picked among the non-bank accounts of the store; transfers
    /// always use two different accounts. Amounts are uniform between 0.01 and
    /// `max_amount`, with two decimal places.
    ///
    /// # Errors
    ///
    /// * `BankError::InvalidTransaction` if there are not enough accounts
    /// * `BankError::InvalidAmount` if `max_amount` is below 0.01
    pub fn generate_random_transactions(
        &self,
        kind: TransactionType,
        count: usize,
        max_amount: Decimal,
    ) -> Result<Vec<TransactionId>, BankError> {
        let candidates: Vec<Account> = self
            .accounts
            .all_accounts()
            .into_iter()
            .filter(|account| !account.is_bank())
            .collect();

        let needed = if kind.category() == TransactionCategory::Transfer {
            2
        } else {
            1
        };
        if candidates.len() < needed {
            return Err(BankError::invalid_transaction(format!(
                "{} needs at least {} customer accounts, found {}",
                kind,
                needed,
                candidates.len()
            )));
        }

        let max_cents = max_amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.trunc().to_i64())
            .filter(|cents| *cents >= 1)
            .ok_or_else(|| BankError::invalid_amount(None, max_amount))?;

        let mut rng = rand::thread_rng();
        let mut ids = Vec::with_capacity(count);

        for _ in 0..count {
            let amount = Decimal::new(rng.gen_range(1..=max_cents), 2);
            let picked: Vec<&Account> = candidates.choose_multiple(&mut rng, needed).collect();

            let builder = TransactionBuilder::new(kind)
                .amount(amount)
                .title(format!("Random {}", kind.display_name()));
            let builder = match kind.category() {
                TransactionCategory::Transfer => {
                    builder.source(picked[0].id).destination(picked[1].id)
                }
                TransactionCategory::Deposit => builder.destination(picked[0].id),
                TransactionCategory::Withdrawal | TransactionCategory::Fee => {
                    builder.source(picked[0].id)
                }
            };

            ids.push(self.register_transaction(builder.build()?)?);
        }

        Ok(ids)
    }

    pub fn lock_count(&self) -> u64 {
        self.locks.lock_count()
    }

    pub fn unlock_count(&self) -> u64 {
        self.locks.unlock_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockingConfig;
    use crate::core::account_store::InMemoryAccountStore;
    use crate::core::transaction_store::InMemoryTransactionStore;
    use crate::types::FailureReason;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn setup(
        balances: &[(i32, Decimal)],
    ) -> (
        TransactionService,
        Arc<InMemoryAccountStore>,
        Arc<InMemoryTransactionStore>,
    ) {
        let accounts = Arc::new(InMemoryAccountStore::with_accounts(
            std::iter::once(Account::bank(Decimal::ZERO)).chain(
                balances
                    .iter()
                    .map(|(id, balance)| Account::new(*id, *id as u32, *balance)),
            ),
        ));
        let transactions = Arc::new(InMemoryTransactionStore::new());
        let service = TransactionService::new(
            ServiceConfig::new(4, LockingConfig::default()),
            Arc::clone(&accounts) as Arc<dyn AccountStore>,
            Arc::clone(&transactions) as Arc<dyn TransactionStore>,
        )
        .unwrap();
        (service, accounts, transactions)
    }

    #[test]
    fn test_register_and_wait() {
        let (service, accounts, transactions) = setup(&[(1, dec!(500.00)), (2, dec!(200.00))]);
        let tx = TransactionBuilder::new(TransactionType::Transfer)
            .source(1)
            .destination(2)
            .amount(dec!(100.00))
            .build()
            .unwrap();

        let id = service.register_transaction(tx).unwrap();
        let report = service.wait_for_all_transactions();

        assert_eq!(report.done, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.outcomes[0].id, id);
        assert_eq!(accounts.balance(1), Some(dec!(400.00)));
        assert_eq!(accounts.balance(2), Some(dec!(300.00)));
        assert_eq!(transactions.get(id).unwrap().status(), TransactionStatus::Done);
    }

    #[test]
    fn test_register_rejects_non_new() {
        let (service, _, _) = setup(&[(1, dec!(1))]);
        let mut tx = TransactionBuilder::new(TransactionType::Deposit)
            .destination(1)
            .amount(dec!(1))
            .build()
            .unwrap();
        tx.fail(FailureReason::Execution).unwrap();

        assert!(matches!(
            service.register_transaction(tx),
            Err(BankError::InvalidTransaction { .. })
        ));
        assert_eq!(service.wait_for_all_transactions().total(), 0);
    }

    #[test]
    fn test_register_rejects_known_id() {
        let (service, accounts, transactions) = setup(&[(1, dec!(500.00)), (2, dec!(200.00))]);
        let tx = TransactionBuilder::new(TransactionType::Transfer)
            .source(1)
            .destination(2)
            .amount(dec!(100.00))
            .build()
            .unwrap();

        service.register_transaction(tx.clone()).unwrap();
        assert_eq!(service.wait_for_all_transactions().done, 1);

        let result = service.register_transaction(tx.clone());
        let report = service.wait_for_all_transactions();

        assert!(matches!(result, Err(BankError::InvalidTransaction { .. })));
        assert_eq!(report.total(), 0);
        assert_eq!(transactions.get(tx.id).unwrap().status(), TransactionStatus::Done);
        assert_eq!(accounts.balance(1), Some(dec!(400.00)));
        assert_eq!(accounts.balance(2), Some(dec!(300.00)));
    }

    #[test]
    fn test_register_rejects_id_taken_while_pending() {
        let (service, accounts, _) = setup(&[(1, dec!(0))]);
        let deposit = |amount| {
            TransactionBuilder::new(TransactionType::Deposit)
                .id(9_000_001)
                .destination(1)
                .amount(amount)
                .build()
                .unwrap()
        };

        service.register_transaction(deposit(dec!(5))).unwrap();
        let result = service.register_transaction(deposit(dec!(7)));
        let report = service.wait_for_all_transactions();

        assert!(matches!(result, Err(BankError::InvalidTransaction { .. })));
        assert_eq!(report.done, 1);
        assert_eq!(accounts.balance(1), Some(dec!(5)));
    }

    #[test]
    fn test_wait_can_be_repeated() {
        let (service, accounts, _) = setup(&[(1, dec!(0))]);

        for round in 1..=3 {
            let tx = TransactionBuilder::new(TransactionType::Deposit)
                .destination(1)
                .amount(dec!(1))
                .build()
                .unwrap();
            service.register_transaction(tx).unwrap();

            let report = service.wait_for_all_transactions();
            assert_eq!(report.done, 1);
            assert_eq!(accounts.balance(1), Some(Decimal::from(round)));
        }
    }

    #[test]
    fn test_process_all_new_transactions() {
        let (service, accounts, transactions) = setup(&[(1, dec!(50)), (2, dec!(0))]);
        for amount in [dec!(10), dec!(15)] {
            let tx = TransactionBuilder::new(TransactionType::TransferInternal)
                .source(1)
                .destination(2)
                .amount(amount)
                .build()
                .unwrap();
            transactions.store(tx).unwrap();
        }

        let ids = service.process_all_new_transactions();
        let report = service.wait_for_all_transactions();

        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);
        assert_eq!(report.done, 2);
        assert_eq!(accounts.balance(2), Some(dec!(25)));
        assert!(transactions.take_new().is_empty());
    }

    #[test]
    fn test_process_all_new_submits_each_transaction_once() {
        let (service, accounts, transactions) = setup(&[(1, dec!(500.00))]);
        for _ in 0..50 {
            let tx = TransactionBuilder::new(TransactionType::Deposit)
                .destination(1)
                .amount(dec!(1.00))
                .build()
                .unwrap();
            transactions.store(tx).unwrap();
        }

        let first = service.process_all_new_transactions();
        let second = service.process_all_new_transactions();
        let report = service.wait_for_all_transactions();

        assert_eq!(first.len(), 50);
        assert!(second.is_empty());
        assert_eq!(report.done, 50);
        assert_eq!(report.failed, 0);
        assert_eq!(accounts.balance(1), Some(dec!(550.00)));
    }

    #[test]
    fn test_process_all_new_skips_registered_transactions() {
        let (service, accounts, _) = setup(&[(1, dec!(0))]);
        let tx = TransactionBuilder::new(TransactionType::Deposit)
            .destination(1)
            .amount(dec!(3))
            .build()
            .unwrap();

        service.register_transaction(tx).unwrap();
        let taken = service.process_all_new_transactions();
        let report = service.wait_for_all_transactions();

        assert!(taken.is_empty());
        assert_eq!(report.total(), 1);
        assert_eq!(accounts.balance(1), Some(dec!(3)));
    }

    #[rstest]
    #[case::transfer(TransactionType::Transfer)]
    #[case::deposit(TransactionType::Deposit)]
    #[case::withdrawal(TransactionType::Withdrawal)]
    #[case::fee(TransactionType::Fee)]
    fn test_generate_random_transactions(#[case] kind: TransactionType) {
        let (service, _, transactions) =
            setup(&[(1, dec!(1000)), (2, dec!(1000)), (3, dec!(1000))]);

        let ids = service
            .generate_random_transactions(kind, 20, dec!(50))
            .unwrap();
        let report = service.wait_for_all_transactions();

        assert_eq!(ids.len(), 20);
        assert_eq!(report.total(), 20);
        for id in ids {
            let tx = transactions.get(id).unwrap();
            assert_eq!(tx.kind, kind);
            assert!(tx.amount >= dec!(0.01) && tx.amount <= dec!(50));
            assert!(tx.amount.scale() <= 2);
            assert_ne!(tx.source, tx.destination);
            assert!(tx.status().is_terminal());
        }
        assert_eq!(service.lock_count(), service.unlock_count());
    }

    #[test]
    fn test_generate_transfers_needs_two_accounts() {
        let (service, _, _) = setup(&[(1, dec!(10))]);

        let result =
            service.generate_random_transactions(TransactionType::Transfer, 1, dec!(5));

        assert!(matches!(result, Err(BankError::InvalidTransaction { .. })));
    }

    #[rstest]
    #[case::below_one_cent(dec!(0.001))]
    #[case::negative(dec!(-5))]
    #[case::overflowing(Decimal::MAX)]
    fn test_generate_rejects_unusable_max_amount(#[case] max_amount: Decimal) {
        let (service, _, _) = setup(&[(1, dec!(10))]);

        let result =
            service.generate_random_transactions(TransactionType::Deposit, 1, max_amount);

        assert!(matches!(result, Err(BankError::InvalidAmount { .. })));
        assert_eq!(service.wait_for_all_transactions().total(), 0);
    }
}
