//! Error types for the bank transaction engine
//!
//! This module defines every error the core can produce. Most of them never
//! reach a caller: the executor folds them into a [`FailureReason`] recorded on
//! the transaction. Only construction-time and infrastructure errors are
//! returned directly.
//!
//! # Error Categories
//!
//! - **Balance Errors**: Invalid amount, insufficient funds, arithmetic overflow
//! - **Locking Errors**: Lock acquisition exhausted its retries
//! - **Transaction Errors**: Malformed transactions, illegal status transitions
//! - **Infrastructure Errors**: Storage, runtime, file I/O and CSV parsing

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountId;
use super::transaction::{FailureReason, TransactionId, TransactionStatus, TransactionType};

/// Main error type for the bank engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankError {
    /// Non-positive amount supplied to a balance operation or builder
    #[error("Invalid amount {amount}{}", account.map(|a| format!(" for account {}", a)).unwrap_or_default())]
    InvalidAmount {
        /// Account the operation targeted (absent for builder validation)
        account: Option<AccountId>,
        /// The rejected amount
        amount: Decimal,
    },

    /// Withdrawal exceeds the current balance
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    /// Lock acquisition exhausted all retries
    ///
    /// Fatal to the individual transaction only.
    #[error("Failed to lock account {account} after {attempts} attempts ({elapsed_ms}ms)")]
    AccountLock {
        account: AccountId,
        attempts: u32,
        elapsed_ms: u128,
    },

    #[error("Account {account} not found")]
    AccountNotFound { account: AccountId },

    /// Transaction failed construction-time validation
    #[error("Invalid transaction: {message}")]
    InvalidTransaction { message: String },

    /// Attempted a non-monotonic status change
    #[error("Transaction {tx}: illegal status transition {from} -> {to}")]
    InvalidStatusTransition {
        tx: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        operation: String,
        account: AccountId,
    },

    /// No strategy registered for the transaction type
    #[error("No strategy registered for transaction type {kind}")]
    NoStrategy { kind: TransactionType },

    #[error("Transaction {tx} not found")]
    TransactionNotFound { tx: TransactionId },

    /// Persistence collaborator failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Worker pool could not be created or a task died
    #[error("Runtime error: {message}")]
    Runtime { message: String },

    /// A caller-supplied setting is out of range
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse { line: Option<u64>, message: String },
}

impl From<std::io::Error> for BankError {
    fn from(error: std::io::Error) -> Self {
        BankError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for BankError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        BankError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

impl BankError {
    pub fn invalid_amount(account: Option<AccountId>, amount: Decimal) -> Self {
        BankError::InvalidAmount { account, amount }
    }

    pub fn insufficient_funds(account: AccountId, balance: Decimal, requested: Decimal) -> Self {
        BankError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    pub fn account_lock(account: AccountId, attempts: u32, elapsed_ms: u128) -> Self {
        BankError::AccountLock {
            account,
            attempts,
            elapsed_ms,
        }
    }

    pub fn account_not_found(account: AccountId) -> Self {
        BankError::AccountNotFound { account }
    }

    pub fn invalid_transaction(message: impl Into<String>) -> Self {
        BankError::InvalidTransaction {
            message: message.into(),
        }
    }

    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        BankError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        BankError::Storage {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        BankError::Runtime {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BankError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Classify this error as the failure reason recorded on a transaction
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            BankError::InsufficientFunds { .. } => FailureReason::InsufficientFunds,
            BankError::InvalidAmount { .. } => FailureReason::InvalidAmount,
            BankError::AccountLock { .. } => FailureReason::LockTimeout,
            BankError::AccountNotFound { .. } => FailureReason::AccountNotFound,
            BankError::Storage { .. } => FailureReason::Persistence,
            _ => FailureReason::Execution,
        }
    }
}
