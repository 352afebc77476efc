//! Withdrawal strategy

use super::{AccountPair, TransactionStrategy};
use crate::types::{BankError, Transaction, TransactionType};

/// Debits the source account
#[derive(Debug, Clone, Copy, Default)]
pub struct WithdrawalStrategy;

impl TransactionStrategy for WithdrawalStrategy {
    fn execute(
        &self,
        transaction: &Transaction,
        accounts: &mut AccountPair,
    ) -> Result<(), BankError> {
        accounts.source_mut()?.withdraw(transaction.amount)
    }

    fn kinds(&self) -> &'static [TransactionType] {
        &[TransactionType::Withdrawal]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, TransactionBuilder};
    use rust_decimal_macros::dec;

    fn withdrawal(amount: rust_decimal::Decimal) -> Transaction {
        TransactionBuilder::new(TransactionType::Withdrawal)
            .source(1)
            .amount(amount)
            .build()
            .unwrap()
    }

    #[test]
    fn test_withdrawal_debits_source() {
        let mut accounts = AccountPair::new(Some(Account::new(1, 1, dec!(500.00))), None);

        WithdrawalStrategy
            .execute(&withdrawal(dec!(125.00)), &mut accounts)
            .unwrap();

        assert_eq!(accounts.source.unwrap().balance, dec!(375.00));
    }

    #[test]
    fn test_overdraft_is_rejected() {
        let mut accounts = AccountPair::new(Some(Account::new(1, 1, dec!(500.00))), None);

        let result = WithdrawalStrategy.execute(&withdrawal(dec!(600.00)), &mut accounts);

        assert_eq!(
            result,
            Err(BankError::insufficient_funds(1, dec!(500.00), dec!(600.00)))
        );
        assert_eq!(accounts.source.unwrap().balance, dec!(500.00));
    }
}
