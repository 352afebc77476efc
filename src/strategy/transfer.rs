//! Transfer strategy
//!
//! Handles every transfer kind (generic, own, internal, external). The debit and
//! credit are applied as a single all-or-nothing step.

use super::{move_funds, AccountPair, TransactionStrategy};
use crate::types::{BankError, Transaction, TransactionType};

/// Moves funds from the source account to the destination account
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferStrategy;

impl TransactionStrategy for TransferStrategy {
    fn execute(
        &self,
        transaction: &Transaction,
        accounts: &mut AccountPair,
    ) -> Result<(), BankError> {
        let (source, destination) = accounts.both_mut()?;
        move_funds(source, destination, transaction.amount)
    }

    fn kinds(&self) -> &'static [TransactionType] {
        &[
            TransactionType::Transfer,
            TransactionType::TransferOwn,
            TransactionType::TransferInternal,
            TransactionType::TransferExternal,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, TransactionBuilder};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn pair(source: rust_decimal::Decimal, destination: rust_decimal::Decimal) -> AccountPair {
        AccountPair::new(
            Some(Account::new(1, 1, source)),
            Some(Account::new(2, 2, destination)),
        )
    }

    #[rstest]
    #[case(TransactionType::Transfer)]
    #[case(TransactionType::TransferOwn)]
    #[case(TransactionType::TransferInternal)]
    #[case(TransactionType::TransferExternal)]
    fn test_transfer_moves_funds(#[case] kind: TransactionType) {
        let tx = TransactionBuilder::new(kind)
            .source(1)
            .destination(2)
            .amount(dec!(100.00))
            .build()
            .unwrap();
        let mut accounts = pair(dec!(500.00), dec!(200.00));

        TransferStrategy.execute(&tx, &mut accounts).unwrap();

        assert_eq!(accounts.source.unwrap().balance, dec!(400.00));
        assert_eq!(accounts.destination.unwrap().balance, dec!(300.00));
    }

    #[test]
    fn test_transfer_with_insufficient_funds_changes_nothing() {
        let tx = TransactionBuilder::new(TransactionType::Transfer)
            .source(1)
            .destination(2)
            .amount(dec!(600.00))
            .build()
            .unwrap();
        let mut accounts = pair(dec!(500.00), dec!(200.00));

        let result = TransferStrategy.execute(&tx, &mut accounts);

        assert!(matches!(result, Err(BankError::InsufficientFunds { .. })));
        assert_eq!(accounts, pair(dec!(500.00), dec!(200.00)));
    }

    #[test]
    fn test_transfer_requires_both_accounts() {
        let tx = TransactionBuilder::new(TransactionType::Transfer)
            .source(1)
            .destination(2)
            .amount(dec!(1))
            .build()
            .unwrap();
        let mut accounts = AccountPair::new(Some(Account::new(1, 1, dec!(10))), None);

        let result = TransferStrategy.execute(&tx, &mut accounts);

        assert!(matches!(result, Err(BankError::InvalidTransaction { .. })));
        assert_eq!(accounts.source.unwrap().balance, dec!(10));
    }
}
