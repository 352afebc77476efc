//! Transaction-related types for the bank engine
//!
//! A [`Transaction`] is an immutable statement of intent (who, whom, how much,
//! what kind) plus a status that only ever moves forward. Transactions are
//! constructed through [`TransactionBuilder`], which enforces the shape each
//! transaction type requires.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use log::warn;
use rust_decimal::Decimal;

use super::account::{Account, AccountId, BANK_ACCOUNT_ID};
use super::error::BankError;
use crate::strategy::{AccountPair, StrategyRegistry};

/// Transaction identifier
pub type TransactionId = u64;

/// Source of identifiers for transactions built without an explicit id
static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Broad family a transaction type belongs to
///
/// The category decides which accounts a transaction touches and which
/// strategy executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionCategory {
    Transfer,
    Deposit,
    Withdrawal,
    Fee,
}

/// Transaction types supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    /// Generic transfer between two accounts
    Transfer,
    /// Transfer between two accounts of the same owner
    TransferOwn,
    /// Transfer to another customer of the bank
    TransferInternal,
    /// Transfer leaving the bank
    TransferExternal,
    /// Credit funds to a destination account
    Deposit,
    /// Debit funds from a source account
    Withdrawal,
    /// Move funds from a source account to the bank
    Fee,
}

impl TransactionType {
    pub const ALL: [TransactionType; 7] = [
        TransactionType::Transfer,
        TransactionType::TransferOwn,
        TransactionType::TransferInternal,
        TransactionType::TransferExternal,
        TransactionType::Deposit,
        TransactionType::Withdrawal,
        TransactionType::Fee,
    ];

    pub fn category(&self) -> TransactionCategory {
        match self {
            TransactionType::Transfer
            | TransactionType::TransferOwn
            | TransactionType::TransferInternal
            | TransactionType::TransferExternal => TransactionCategory::Transfer,
            TransactionType::Deposit => TransactionCategory::Deposit,
            TransactionType::Withdrawal => TransactionCategory::Withdrawal,
            TransactionType::Fee => TransactionCategory::Fee,
        }
    }

    /// Machine name, as used in CSV input and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "transfer",
            TransactionType::TransferOwn => "transfer_own",
            TransactionType::TransferInternal => "transfer_internal",
            TransactionType::TransferExternal => "transfer_external",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Fee => "fee",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "Transfer",
            TransactionType::TransferOwn => "Own Account Transfer",
            TransactionType::TransferInternal => "Internal Transfer",
            TransactionType::TransferExternal => "External Transfer",
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Fee => "Fee",
        }
    }

    pub fn requires_source(&self) -> bool {
        !matches!(self.category(), TransactionCategory::Deposit)
    }

    pub fn requires_destination(&self) -> bool {
        matches!(
            self.category(),
            TransactionCategory::Transfer | TransactionCategory::Deposit | TransactionCategory::Fee
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransactionType {
    type Err = BankError;

    /// Accepts machine names and display names, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        TransactionType::ALL
            .into_iter()
            .find(|kind| {
                kind.name().eq_ignore_ascii_case(needle)
                    || kind.display_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                BankError::invalid_transaction(format!("unknown transaction type '{}'", s))
            })
    }
}

/// Lifecycle status of a transaction
///
/// Transitions are monotonic: `New -> Pending -> {Done | Failed}`, with
/// `New -> Failed` allowed when a transaction never got its locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    New,
    Pending,
    Done,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Done | TransactionStatus::Failed)
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (New, Pending) | (New, Failed) | (Pending, Done) | (Pending, Failed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::New => "NEW",
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Done => "DONE",
            TransactionStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Why a transaction ended up `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    InsufficientFunds,
    InvalidAmount,
    LockTimeout,
    AccountNotFound,
    Execution,
    Persistence,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::InsufficientFunds => "insufficient funds",
            FailureReason::InvalidAmount => "invalid amount",
            FailureReason::LockTimeout => "lock timeout",
            FailureReason::AccountNotFound => "account not found",
            FailureReason::Execution => "execution failed",
            FailureReason::Persistence => "persistence failed",
        };
        f.write_str(text)
    }
}

/// A money movement request and its processing state
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,

    /// Debited account; absent for pure deposits
    pub source: Option<AccountId>,

    /// Credited account; absent for pure withdrawals
    pub destination: Option<AccountId>,

    /// Always strictly positive
    pub amount: Decimal,

    pub kind: TransactionType,
    pub title: String,
    pub created_at: DateTime<Utc>,

    status: TransactionStatus,
    failure: Option<FailureReason>,
}

impl Transaction {
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Reason recorded when the transaction failed
    pub fn failure(&self) -> Option<FailureReason> {
        self.failure
    }

    /// Advance the status, rejecting any backwards or sideways move
    pub fn set_status(&mut self, next: TransactionStatus) -> Result<(), BankError> {
        if !self.status.can_transition_to(next) {
            return Err(BankError::InvalidStatusTransition {
                tx: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Mark the transaction `Failed` with a reason
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), BankError> {
        self.set_status(TransactionStatus::Failed)?;
        self.failure = Some(reason);
        Ok(())
    }

    /// Feasibility check performed under lock, before any mutation
    ///
    /// Returns true for transaction types without a source account.
    pub fn is_transaction_possible(&self, source: Option<&Account>) -> bool {
        if !self.kind.requires_source() {
            return true;
        }
        source.is_some_and(|account| account.can_withdraw(self.amount))
    }

    /// Run the strategy bound to this transaction's type against `accounts`
    ///
    /// Strategy errors are logged and reduced to a [`FailureReason`]; they never
    /// propagate as errors past this call.
    pub fn execute(
        &self,
        registry: &StrategyRegistry,
        accounts: &mut AccountPair,
    ) -> Result<(), FailureReason> {
        let result = registry
            .get(self.kind)
            .and_then(|strategy| strategy.execute(self, accounts));

        result.map_err(|e| {
            warn!(
                "Transaction {} ({}, {:?} -> {:?}, amount {}) failed: {}",
                self.id, self.kind, self.source, self.destination, self.amount, e
            );
            e.failure_reason()
        })
    }
}

/// Builder validating the shape of a transaction before it exists
///
/// ```
/// use rust_bank_engine::{TransactionBuilder, TransactionType};
/// use rust_decimal::Decimal;
///
/// let tx = TransactionBuilder::new(TransactionType::Transfer)
///     .source(1)
///     .destination(2)
///     .amount(Decimal::new(10000, 2))
///     .title("Rent")
///     .build()
///     .unwrap();
/// assert_eq!(tx.amount, Decimal::new(10000, 2));
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    kind: TransactionType,
    id: Option<TransactionId>,
    source: Option<AccountId>,
    destination: Option<AccountId>,
    amount: Option<Decimal>,
    title: Option<String>,
}

impl TransactionBuilder {
    pub fn new(kind: TransactionType) -> Self {
        Self {
            kind,
            id: None,
            source: None,
            destination: None,
            amount: None,
            title: None,
        }
    }

    /// Use an explicit identifier instead of the next generated one
    pub fn id(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn source(mut self, account: AccountId) -> Self {
        self.source = Some(account);
        self
    }

    pub fn destination(mut self, account: AccountId) -> Self {
        self.destination = Some(account);
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Validate and produce a `New` transaction
    ///
    /// # Errors
    ///
    /// * `BankError::InvalidAmount` if the amount is missing or not positive
    /// * `BankError::InvalidTransaction` if an account required by the type is
    ///   missing, a forbidden one is present, or a transfer targets its source
    pub fn build(self) -> Result<Transaction, BankError> {
        let amount = self
            .amount
            .ok_or_else(|| BankError::invalid_transaction("amount is required"))?;
        if amount <= Decimal::ZERO {
            return Err(BankError::invalid_amount(None, amount));
        }

        let kind = self.kind;
        let destination = match kind.category() {
            TransactionCategory::Fee => Some(self.destination.unwrap_or(BANK_ACCOUNT_ID)),
            _ => self.destination,
        };

        if kind.requires_source() && self.source.is_none() {
            return Err(BankError::invalid_transaction(format!(
                "{} requires a source account",
                kind
            )));
        }
        if !kind.requires_source() && self.source.is_some() {
            return Err(BankError::invalid_transaction(format!(
                "{} must not have a source account",
                kind
            )));
        }
        if kind.requires_destination() && destination.is_none() {
            return Err(BankError::invalid_transaction(format!(
                "{} requires a destination account",
                kind
            )));
        }
        if !kind.requires_destination() && destination.is_some() {
            return Err(BankError::invalid_transaction(format!(
                "{} must not have a destination account",
                kind
            )));
        }
        if self.source.is_some() && self.source == destination {
            return Err(BankError::invalid_transaction(
                "source and destination accounts must differ",
            ));
        }

        let id = self
            .id
            .unwrap_or_else(|| NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed));
        let title = self
            .title
            .unwrap_or_else(|| kind.display_name().to_string());

        Ok(Transaction {
            id,
            source: self.source,
            destination,
            amount,
            kind,
            title,
            created_at: Utc::now(),
            status: TransactionStatus::New,
            failure: None,
        })
    }
}
