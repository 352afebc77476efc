//! CSV format handling for transaction input and balance output
//!
//! Input rows have the columns `type,source,destination,amount,title`. The
//! account columns are left empty where the transaction type has no such
//! side; `title` is optional. Output rows are `account,balance`.
//!
//! All functions are pure (no file I/O) for easy testing.

use std::io::Write;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{
    Account, AccountId, BankError, Transaction, TransactionBuilder, TransactionType,
};

/// CSV record structure for deserialization
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: Option<AccountId>,
    pub destination: Option<AccountId>,
    pub amount: String,
    pub title: Option<String>,
}

/// Convert a CsvRecord into a new Transaction
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
/// * `line` - Line number of the record, for error messages
///
/// # Returns
///
/// * `Ok(Transaction)` in `New` status with a fresh id
/// * `Err(BankError::Parse)` if the type or amount cannot be parsed, or the
///   accounts do not match the transaction type
pub fn convert_csv_record(csv_record: CsvRecord, line: u64) -> Result<Transaction, BankError> {
    let parse_error = |message: String| BankError::Parse {
        line: Some(line),
        message,
    };

    let kind = TransactionType::from_str(&csv_record.kind)
        .map_err(|_| parse_error(format!("Invalid transaction type: '{}'", csv_record.kind)))?;

    let amount = Decimal::from_str(csv_record.amount.trim())
        .map_err(|_| parse_error(format!("Invalid amount '{}'", csv_record.amount)))?;

    let mut builder = TransactionBuilder::new(kind).amount(amount);
    if let Some(source) = csv_record.source {
        builder = builder.source(source);
    }
    if let Some(destination) = csv_record.destination {
        builder = builder.destination(destination);
    }
    if let Some(title) = csv_record.title.filter(|t| !t.trim().is_empty()) {
        builder = builder.title(title);
    }

    builder.build().map_err(|e| parse_error(e.to_string()))
}

/// Write account balances to CSV format
///
/// Writes accounts with columns `account,balance`, sorted by account id, with
/// balances at two decimal places.
///
/// # Arguments
///
/// * `accounts` - Slice of accounts to write
/// * `output` - Mutable reference to a writer for outputting CSV
pub fn write_balances_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), BankError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "balance"])?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer.write_record(&[account.id.to_string(), format!("{:.2}", account.balance)])?;
    }

    writer.flush()?;
    Ok(())
}
