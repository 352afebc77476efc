//! Transaction strategy module
//!
//! Each transaction category has one strategy that knows how to mutate the
//! accounts involved. Strategies are selected through a [`StrategyRegistry`]
//! keyed by [`TransactionType`] instead of branching on the type at the call
//! site, so new transaction kinds only need a new registration.
//!
//! Strategies run while the executor holds the locks of every account in the
//! [`AccountPair`]. They work on loaded copies of the accounts; the executor
//! only persists those copies when the strategy succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::types::{Account, BankError, Transaction, TransactionType};

mod deposit;
mod fee;
mod transfer;
mod withdrawal;

pub use deposit::DepositStrategy;
pub use fee::FeeStrategy;
pub use transfer::TransferStrategy;
pub use withdrawal::WithdrawalStrategy;

/// Balance mutation logic for one family of transaction types
pub trait TransactionStrategy: Send + Sync {
    /// Apply `transaction` to the locked `accounts`
    ///
    /// Implementations must leave the accounts unchanged when they return an
    /// error.
    fn execute(&self, transaction: &Transaction, accounts: &mut AccountPair)
        -> Result<(), BankError>;

    /// Transaction types this strategy handles
    fn kinds(&self) -> &'static [TransactionType];
}

/// Locked copies of the accounts a transaction touches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountPair {
    pub source: Option<Account>,
    pub destination: Option<Account>,
}

impl AccountPair {
    pub fn new(source: Option<Account>, destination: Option<Account>) -> Self {
        Self {
            source,
            destination,
        }
    }

    pub fn source_mut(&mut self) -> Result<&mut Account, BankError> {
        self.source
            .as_mut()
            .ok_or_else(|| BankError::invalid_transaction("source account is not loaded"))
    }

    pub fn destination_mut(&mut self) -> Result<&mut Account, BankError> {
        self.destination
            .as_mut()
            .ok_or_else(|| BankError::invalid_transaction("destination account is not loaded"))
    }

    /// Both accounts at once, for two-sided movements
    pub fn both_mut(&mut self) -> Result<(&mut Account, &mut Account), BankError> {
        match (self.source.as_mut(), self.destination.as_mut()) {
            (Some(source), Some(destination)) => Ok((source, destination)),
            (None, _) => Err(BankError::invalid_transaction(
                "source account is not loaded",
            )),
            (_, None) => Err(BankError::invalid_transaction(
                "destination account is not loaded",
            )),
        }
    }

    /// The loaded accounts, in source/destination order
    pub fn into_accounts(self) -> Vec<Account> {
        self.source.into_iter().chain(self.destination).collect()
    }
}

/// Move `amount` from `source` to `destination` as one step
///
/// If the deposit side fails the withdrawal is reversed, so either both
/// balances change or neither does.
pub(crate) fn move_funds(
    source: &mut Account,
    destination: &mut Account,
    amount: rust_decimal::Decimal,
) -> Result<(), BankError> {
    source.withdraw(amount)?;
    if let Err(e) = destination.deposit(amount) {
        // Undo the debit; restoring a balance that just held `amount` cannot fail.
        source.balance += amount;
        return Err(e);
    }
    Ok(())
}

/// Mapping from transaction type to the strategy that executes it
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<TransactionType, Arc<dyn TransactionStrategy>>,
}

impl StrategyRegistry {
    /// Registry with no strategies
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Build a registry from a list of strategies
    ///
    /// When two strategies claim the same type, the one registered last wins.
    pub fn from_strategies(strategies: Vec<Arc<dyn TransactionStrategy>>) -> Self {
        let mut registry = Self::empty();
        for strategy in strategies {
            registry.register(strategy);
        }
        debug!("Registered strategies for {} transaction types", registry.len());
        registry
    }

    pub fn register(&mut self, strategy: Arc<dyn TransactionStrategy>) {
        for kind in strategy.kinds() {
            debug!("Registering strategy for {}", kind);
            self.strategies.insert(*kind, Arc::clone(&strategy));
        }
    }

    /// Strategy for `kind`
    ///
    /// # Errors
    ///
    /// `BankError::NoStrategy` when nothing is registered for `kind`.
    pub fn get(&self, kind: TransactionType) -> Result<Arc<dyn TransactionStrategy>, BankError> {
        self.strategies
            .get(&kind)
            .cloned()
            .ok_or(BankError::NoStrategy { kind })
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    /// Registry covering every [`TransactionType`]
    fn default() -> Self {
        let strategies: Vec<Arc<dyn TransactionStrategy>> = vec![
            Arc::new(TransferStrategy),
            Arc::new(DepositStrategy),
            Arc::new(WithdrawalStrategy),
            Arc::new(FeeStrategy),
        ];
        Self::from_strategies(strategies)
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.strategies.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("StrategyRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionBuilder;
    use rust_decimal_macros::dec;

    struct AlwaysFails;

    impl TransactionStrategy for AlwaysFails {
        fn execute(&self, _: &Transaction, _: &mut AccountPair) -> Result<(), BankError> {
            Err(BankError::invalid_transaction("nope"))
        }

        fn kinds(&self) -> &'static [TransactionType] {
            &[TransactionType::Deposit]
        }
    }

    #[test]
    fn test_default_registry_covers_every_type() {
        let registry = StrategyRegistry::default();

        assert_eq!(registry.len(), TransactionType::ALL.len());
        for kind in TransactionType::ALL {
            assert!(registry.get(kind).is_ok(), "missing strategy for {}", kind);
        }
    }

    #[test]
    fn test_empty_registry_reports_missing_strategy() {
        let registry = StrategyRegistry::empty();

        assert!(registry.is_empty());
        assert!(matches!(
            registry.get(TransactionType::Fee),
            Err(BankError::NoStrategy {
                kind: TransactionType::Fee
            })
        ));
    }

    #[test]
    fn test_last_registration_wins() {
        let strategies: Vec<Arc<dyn TransactionStrategy>> =
            vec![Arc::new(DepositStrategy), Arc::new(AlwaysFails)];
        let registry = StrategyRegistry::from_strategies(strategies);

        let tx = TransactionBuilder::new(TransactionType::Deposit)
            .destination(1)
            .amount(dec!(1))
            .build()
            .unwrap();
        let mut pair = AccountPair::new(None, Some(Account::new(1, 1, dec!(0))));

        let result = registry
            .get(TransactionType::Deposit)
            .unwrap()
            .execute(&tx, &mut pair);
        assert!(result.is_err());
    }

    #[test]
    fn test_move_funds_rolls_back_on_deposit_failure() {
        let mut source = Account::new(1, 1, dec!(10));
        let mut destination = Account::new(2, 2, rust_decimal::Decimal::MAX);

        let result = move_funds(&mut source, &mut destination, dec!(5));

        assert!(matches!(result, Err(BankError::ArithmeticOverflow { .. })));
        assert_eq!(source.balance, dec!(10));
        assert_eq!(destination.balance, rust_decimal::Decimal::MAX);
    }

    #[test]
    fn test_into_accounts_keeps_order() {
        let pair = AccountPair::new(
            Some(Account::new(5, 1, dec!(1))),
            Some(Account::new(2, 1, dec!(1))),
        );

        let ids: Vec<_> = pair.into_accounts().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![5, 2]);
    }
}
