//! Deposit strategy

use super::{AccountPair, TransactionStrategy};
use crate::types::{BankError, Transaction, TransactionType};

/// Credits the destination account
#[derive(Debug, Clone, Copy, Default)]
pub struct DepositStrategy;

impl TransactionStrategy for DepositStrategy {
    fn execute(
        &self,
        transaction: &Transaction,
        accounts: &mut AccountPair,
    ) -> Result<(), BankError> {
        accounts.destination_mut()?.deposit(transaction.amount)
    }

    fn kinds(&self) -> &'static [TransactionType] {
        &[TransactionType::Deposit]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, TransactionBuilder};
    use rust_decimal_macros::dec;

    #[test]
    fn test_deposit_credits_destination() {
        let tx = TransactionBuilder::new(TransactionType::Deposit)
            .destination(3)
            .amount(dec!(12.34))
            .build()
            .unwrap();
        let mut accounts = AccountPair::new(None, Some(Account::new(3, 1, dec!(0.66))));

        DepositStrategy.execute(&tx, &mut accounts).unwrap();

        assert_eq!(accounts.destination.unwrap().balance, dec!(13.00));
    }

    #[test]
    fn test_deposit_without_destination_fails() {
        let tx = TransactionBuilder::new(TransactionType::Deposit)
            .destination(3)
            .amount(dec!(1))
            .build()
            .unwrap();
        let mut accounts = AccountPair::default();

        assert!(DepositStrategy.execute(&tx, &mut accounts).is_err());
    }
}
