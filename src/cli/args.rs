use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rust_decimal::Decimal;

use crate::config::{LockingConfig, ServiceConfig};
use crate::types::TransactionType;

/// Run bank transactions concurrently against seeded accounts
#[derive(Parser, Debug)]
#[command(name = "bank-engine")]
#[command(
    about = "Run bank transactions concurrently and print the final balances",
    long_about = None
)]
pub struct CliArgs {
    /// CSV file with columns type,source,destination,amount,title
    #[arg(
        long = "input",
        value_name = "FILE",
        help = "Read transactions from a CSV file instead of generating random ones"
    )]
    pub input_file: Option<PathBuf>,

    /// Number of customer accounts to seed, with ids 1..=N
    #[arg(
        long = "accounts",
        value_name = "COUNT",
        default_value_t = 10,
        help = "Number of customer accounts to create"
    )]
    pub accounts: u32,

    #[arg(
        long = "initial-balance",
        value_name = "AMOUNT",
        default_value = "1000.00",
        help = "Starting balance of every customer account"
    )]
    pub initial_balance: Decimal,

    /// Random transactions to generate when no input file is given
    #[arg(
        long = "random",
        value_name = "COUNT",
        default_value_t = 100,
        help = "Number of random transactions to generate"
    )]
    pub random_count: usize,

    #[arg(
        long = "kind",
        value_name = "TYPE",
        default_value = "transfer",
        help = "Type of the random transactions (e.g. transfer, deposit, withdrawal, fee)"
    )]
    pub kind: TransactionType,

    #[arg(
        long = "max-amount",
        value_name = "AMOUNT",
        default_value = "1000.00",
        help = "Upper bound of random transaction amounts"
    )]
    pub max_amount: Decimal,

    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Worker threads executing transactions (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        help = "Lock attempts per account before a transaction fails (default: 5)"
    )]
    pub max_attempts: Option<u32>,

    #[arg(
        long = "base-delay-ms",
        value_name = "MS",
        help = "Initial backoff between lock attempts (default: 10)"
    )]
    pub base_delay_ms: Option<u64>,

    #[arg(
        long = "max-delay-ms",
        value_name = "MS",
        help = "Backoff cap between lock attempts (default: 200)"
    )]
    pub max_delay_ms: Option<u64>,

    #[arg(
        long = "attempt-timeout-ms",
        value_name = "MS",
        help = "Time a single lock attempt may wait (default: 100)"
    )]
    pub attempt_timeout_ms: Option<u64>,
}

impl CliArgs {
    /// Create a ServiceConfig from CLI arguments
    ///
    /// Missing values fall back to defaults; invalid ones are replaced with
    /// defaults by the config constructors, which log a warning.
    pub fn to_service_config(&self) -> ServiceConfig {
        let default = LockingConfig::default();
        let locking = LockingConfig::new(
            self.max_attempts.unwrap_or(default.max_attempts),
            self.base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(default.base_delay),
            self.max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(default.max_delay),
            self.attempt_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default.attempt_timeout),
        );

        match self.workers {
            Some(workers) => ServiceConfig::new(workers, locking),
            None => ServiceConfig {
                locking,
                ..ServiceConfig::default()
            },
        }
    }
}
