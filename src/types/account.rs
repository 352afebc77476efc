//! Account-related types for the bank engine
//!
//! An [`Account`] is a plain value. It carries no lock of its own: mutual
//! exclusion is coordinated by the lock manager across one or two accounts at
//! a time, which a per-method lock could not express.

use rust_decimal::Decimal;

use super::error::BankError;

/// Account identifier
pub type AccountId = i32;

/// Owner (user) identifier
pub type OwnerId = u32;

/// Identifier of the sentinel bank account
///
/// The bank is the counterparty for fee collection and sorts before every
/// customer account in the canonical lock order.
pub const BANK_ACCOUNT_ID: AccountId = -1;

/// A customer or system account holding an exact decimal balance
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,

    /// Current balance, never negative
    pub balance: Decimal,

    /// Owning user; `None` only for the bank sentinel
    pub owner: Option<OwnerId>,
}

impl Account {
    /// Create a customer account with the given opening balance
    pub fn new(id: AccountId, owner: OwnerId, balance: Decimal) -> Self {
        Account {
            id,
            balance,
            owner: Some(owner),
        }
    }

    /// Create the sentinel bank account
    pub fn bank(balance: Decimal) -> Self {
        Account {
            id: BANK_ACCOUNT_ID,
            balance,
            owner: None,
        }
    }

    pub fn is_bank(&self) -> bool {
        self.id == BANK_ACCOUNT_ID
    }

    /// Ownership check; the bank account passes for every owner
    pub fn is_owned_by(&self, owner: OwnerId) -> bool {
        self.is_bank() || self.owner == Some(owner)
    }

    /// Whether `amount` could be withdrawn right now
    pub fn can_withdraw(&self, amount: Decimal) -> bool {
        amount > Decimal::ZERO && self.balance >= amount
    }

    /// Credit `amount` to the account
    ///
    /// Caller must hold this account's lock.
    ///
    /// # Errors
    ///
    /// * `BankError::InvalidAmount` if `amount <= 0`
    /// * `BankError::ArithmeticOverflow` if the balance would overflow
    pub fn deposit(&mut self, amount: Decimal) -> Result<(), BankError> {
        if amount <= Decimal::ZERO {
            return Err(BankError::invalid_amount(Some(self.id), amount));
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| BankError::arithmetic_overflow("deposit", self.id))?;
        Ok(())
    }

    /// Debit `amount` from the account
    ///
    /// Caller must hold this account's lock. The balance is left untouched on
    /// error.
    ///
    /// # Errors
    ///
    /// * `BankError::InvalidAmount` if `amount <= 0`
    /// * `BankError::InsufficientFunds` if `amount` exceeds the balance
    pub fn withdraw(&mut self, amount: Decimal) -> Result<(), BankError> {
        if amount <= Decimal::ZERO {
            return Err(BankError::invalid_amount(Some(self.id), amount));
        }
        if amount > self.balance {
            return Err(BankError::insufficient_funds(self.id, self.balance, amount));
        }

        self.balance -= amount;
        Ok(())
    }
}
