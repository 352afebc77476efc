//! Core business logic module
//!
//! This module contains the concurrent execution components:
//! - `traits` - Persistence collaborator abstractions
//! - `account_store` / `transaction_store` - In-memory implementations
//! - `lock_manager` - Ordered per-account locks with retry and backoff
//! - `executor` - Per-transaction lock/validate/execute state machine
//! - `service` - Worker pool, submission and the completion barrier

pub mod account_store;
pub mod executor;
pub mod lock_manager;
pub mod service;
pub mod traits;
pub mod transaction_store;

pub use account_store::InMemoryAccountStore;
pub use executor::{ExecutorPhase, TransactionExecutor, TransactionOutcome};
pub use lock_manager::{AccountLocks, LockManager};
pub use service::{BatchReport, TransactionService};
pub use traits::{AccountStore, TransactionStore};
pub use transaction_store::InMemoryTransactionStore;
