// CLI module
// Command-line interface, argument parsing and the demo driver

mod args;

pub use args::CliArgs;

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use log::{info, warn};
use rust_decimal::Decimal;

use crate::core::{
    AccountStore, BatchReport, InMemoryAccountStore, InMemoryTransactionStore, TransactionService,
    TransactionStore,
};
use crate::io::{write_balances_csv, TransactionReader};
use crate::types::{Account, AccountId, BankError};

/// Parse command-line arguments using clap
///
/// If parsing fails (invalid arguments or `--help`), clap displays an error or
/// help text and exits the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Run the demo: seed accounts, execute transactions, print balances
///
/// Customer accounts `1..=args.accounts` are created with
/// `args.initial_balance`, plus the bank account with a zero balance.
/// Transactions come from `args.input_file` when given, otherwise
/// `args.random_count` random ones of `args.kind` are generated. Rows of the
/// input file that fail to parse are logged and skipped.
///
/// # Arguments
///
/// * `args` - Parsed command-line arguments
/// * `output` - Writer receiving the final `account,balance` CSV
///
/// # Returns
///
/// * `Ok(BatchReport)` describing every executed transaction
/// * `Err(BankError)` on a fatal error such as a negative initial balance, an
///   account count beyond the id range, an unreadable input file or a failed
///   write
pub fn run(args: &CliArgs, output: &mut dyn Write) -> Result<BatchReport, BankError> {
    if args.initial_balance < Decimal::ZERO {
        return Err(BankError::invalid_amount(None, args.initial_balance));
    }

    let accounts = Arc::new(seed_accounts(args.accounts, args.initial_balance)?);
    let transactions = Arc::new(InMemoryTransactionStore::new());
    let opening_total = accounts.total_balance();

    let service = TransactionService::new(
        args.to_service_config(),
        Arc::clone(&accounts) as Arc<dyn AccountStore>,
        Arc::clone(&transactions) as Arc<dyn TransactionStore>,
    )?;

    match &args.input_file {
        Some(path) => {
            for result in TransactionReader::open(path)? {
                match result {
                    Ok(transaction) => {
                        service.register_transaction(transaction)?;
                    }
                    Err(e) => warn!("Skipping row: {}", e),
                }
            }
        }
        None => {
            service.generate_random_transactions(args.kind, args.random_count, args.max_amount)?;
        }
    }

    let report = service.wait_for_all_transactions();
    let closing_total = accounts.total_balance();

    info!(
        "{} transactions: {} done, {} failed; locks {}/{}; total balance {} -> {}",
        report.total(),
        report.done,
        report.failed,
        service.lock_count(),
        service.unlock_count(),
        opening_total,
        closing_total
    );

    write_balances_csv(&accounts.all_accounts(), output)?;
    Ok(report)
}

fn seed_accounts(
    count: u32,
    initial_balance: Decimal,
) -> Result<InMemoryAccountStore, BankError> {
    let last = AccountId::try_from(count).map_err(|_| {
        BankError::invalid_argument(format!(
            "cannot create {} accounts, the largest account id is {}",
            count,
            AccountId::MAX
        ))
    })?;

    let customers = (1..=last)
        .zip(1..=count)
        .map(|(id, owner)| Account::new(id, owner, initial_balance));
    let bank = std::iter::once(Account::bank(Decimal::ZERO));
    Ok(InMemoryAccountStore::with_accounts(bank.chain(customers)))
}
