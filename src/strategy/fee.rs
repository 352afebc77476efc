//! Fee strategy
//!
//! Fees are collected into the bank sentinel account. The builder fills in the
//! bank as destination, so the executor locks it like any other account.

use super::{move_funds, AccountPair, TransactionStrategy};
use crate::types::{BankError, Transaction, TransactionType};

/// Moves a fee from the source account to the bank
#[derive(Debug, Clone, Copy, Default)]
pub struct FeeStrategy;

impl TransactionStrategy for FeeStrategy {
    fn execute(
        &self,
        transaction: &Transaction,
        accounts: &mut AccountPair,
    ) -> Result<(), BankError> {
        let (source, bank) = accounts.both_mut()?;
        if !bank.is_bank() {
            return Err(BankError::invalid_transaction(format!(
                "fee {} must be collected by the bank account, not account {}",
                transaction.id, bank.id
            )));
        }
        move_funds(source, bank, transaction.amount)
    }

    fn kinds(&self) -> &'static [TransactionType] {
        &[TransactionType::Fee]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, TransactionBuilder};
    use rust_decimal_macros::dec;

    fn fee(amount: rust_decimal::Decimal) -> Transaction {
        TransactionBuilder::new(TransactionType::Fee)
            .source(8)
            .amount(amount)
            .build()
            .unwrap()
    }

    #[test]
    fn test_fee_is_collected_by_bank() {
        let mut accounts = AccountPair::new(
            Some(Account::new(8, 1, dec!(20.00))),
            Some(Account::bank(dec!(1000.00))),
        );

        FeeStrategy.execute(&fee(dec!(2.50)), &mut accounts).unwrap();

        assert_eq!(accounts.source.unwrap().balance, dec!(17.50));
        assert_eq!(accounts.destination.unwrap().balance, dec!(1002.50));
    }

    #[test]
    fn test_fee_larger_than_balance_fails_without_changes() {
        let mut accounts = AccountPair::new(
            Some(Account::new(8, 1, dec!(1.00))),
            Some(Account::bank(dec!(0))),
        );

        let result = FeeStrategy.execute(&fee(dec!(2.50)), &mut accounts);

        assert!(matches!(result, Err(BankError::InsufficientFunds { .. })));
        assert_eq!(accounts.source.unwrap().balance, dec!(1.00));
        assert_eq!(accounts.destination.unwrap().balance, dec!(0));
    }

    #[test]
    fn test_fee_to_customer_account_is_rejected() {
        let mut accounts = AccountPair::new(
            Some(Account::new(8, 1, dec!(10.00))),
            Some(Account::new(9, 2, dec!(0))),
        );

        let result = FeeStrategy.execute(&fee(dec!(1.00)), &mut accounts);

        assert!(matches!(result, Err(BankError::InvalidTransaction { .. })));
        assert_eq!(accounts.source.unwrap().balance, dec!(10.00));
    }
}
