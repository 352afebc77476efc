//! Types module
//!
//! Contains core data structures used throughout the engine:
//! - `account`: Account entity and the bank sentinel
//! - `transaction`: Transaction, its type/status enums and the builder
//! - `error`: Error types for the engine

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountId, OwnerId, BANK_ACCOUNT_ID};
pub use error::BankError;
pub use transaction::{
    FailureReason, Transaction, TransactionBuilder, TransactionCategory, TransactionId,
    TransactionStatus, TransactionType,
};
