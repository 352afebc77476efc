//! Rust Bank Engine Library
//! # Overview
//!
//! This library is the concurrent execution core of a bank: it applies
//! transfers, deposits, withdrawals and fees to shared account balances from
//! many worker threads at once, without losing money or deadlocking.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transaction, errors)
//! - [`strategy`] - Balance mutation logic per transaction type
//! - [`core`] - Concurrency and orchestration:
//!   - [`core::lock_manager`] - Ordered per-account locks with retry and backoff
//!   - [`core::executor`] - Lock, validate, execute, unlock state machine
//!   - [`core::service`] - Worker pool, submission and completion barrier
//!   - [`core::traits`] - Account and transaction store abstractions
//! - [`config`] - Worker and locking configuration
//! - [`io`] - CSV input and balance output for the demo driver
//! - [`cli`] - CLI arguments parsing and the demo driver
//!
//! # Transaction Types
//!
//! - **Transfer** (plain, own account, internal, external): Move funds between
//!   two different accounts
//! - **Deposit**: Credit funds to an account
//! - **Withdrawal**: Debit funds from an account (requires sufficient balance)
//! - **Fee**: Move funds from an account to the bank account (id `-1`)
//!
//! # Transaction Lifecycle
//!
//! `NEW -> PENDING -> DONE | FAILED`, or `NEW -> FAILED` when the accounts
//! could not be locked. A failed transaction never changes any balance.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use config::{LockingConfig, ServiceConfig};
pub use core::{
    AccountStore, BatchReport, InMemoryAccountStore, InMemoryTransactionStore, LockManager,
    TransactionExecutor, TransactionOutcome, TransactionService, TransactionStore,
};
pub use io::write_balances_csv;
pub use strategy::{StrategyRegistry, TransactionStrategy};
pub use types::{
    Account, AccountId, BankError, FailureReason, Transaction, TransactionBuilder,
    TransactionId, TransactionStatus, TransactionType, BANK_ACCOUNT_ID,
};
