//! Bank transaction engine demo CLI
//!
//! Seeds a set of accounts, runs transactions against them on a worker pool
//! and prints the final balances as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts 20 --random 500 --kind transfer > balances.csv
//! cargo run -- --input transactions.csv --workers 8 > balances.csv
//! RUST_LOG=debug cargo run -- --random 10
//! ```
//!
//! Logs go to stderr (level `warn` unless `RUST_LOG` says otherwise); stdout
//! only carries the `account,balance` CSV.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (input file not readable, invalid configuration, etc.)

use rust_bank_engine::cli;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = cli::parse_args();

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(&args, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
