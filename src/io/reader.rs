//! Streaming CSV reader for transaction input
//!
//! `TransactionReader` yields one `Result<Transaction, BankError>` per CSV row.
//! A bad row does not stop the stream: the caller decides whether to skip it.
//!
//! ```no_run
//! use rust_bank_engine::io::TransactionReader;
//! use std::path::Path;
//!
//! let reader = TransactionReader::open(Path::new("transactions.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(tx) => println!("Read transaction {}", tx.id),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{BankError, Transaction};

/// Iterator over the transactions of a CSV source
#[derive(Debug)]
pub struct TransactionReader<R> {
    reader: csv::Reader<R>,
    line_num: u64,
}

impl TransactionReader<File> {
    /// Open a CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(TransactionReader)` if the file opened successfully
    /// * `Err(BankError::Io)` if it could not be opened
    pub fn open(path: &Path) -> Result<Self, BankError> {
        let file = File::open(path).map_err(|e| BankError::Io {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> TransactionReader<R> {
    /// Wrap any byte source containing CSV with a header row
    pub fn from_reader(source: R) -> Self {
        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(source);

        Self {
            reader,
            line_num: 1,
        }
    }
}

impl<R: Read> Iterator for TransactionReader<R> {
    type Item = Result<Transaction, BankError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        Some(match next {
            Ok(csv_record) => convert_csv_record(csv_record, self.line_num),
            Err(e) => Err(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionType;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,source,destination,amount,title\n";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_open_missing_file() {
        let result = TransactionReader::open(Path::new("nonexistent.csv"));

        match result {
            Err(BankError::Io { message }) => assert!(message.contains("Failed to open file")),
            other => panic!("expected I/O error, got {:?}", other),
        }
    }

    #[test]
    fn test_reads_rows_from_file() {
        let file = create_temp_csv(&format!(
            "{}transfer,1,2,100.00,Rent\ndeposit,,3,5,\nwithdrawal,3,,1.5,\n",
            HEADER
        ));

        let transactions: Vec<_> = TransactionReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].kind, TransactionType::Transfer);
        assert_eq!(transactions[0].title, "Rent");
        assert_eq!(transactions[1].source, None);
        assert_eq!(transactions[1].destination, Some(3));
        assert_eq!(transactions[2].amount, dec!(1.5));
    }

    #[test]
    fn test_bad_row_reports_line_and_continues() {
        let input = format!("{}deposit,,1,10,\nbogus,1,2,1,\nfee,1,,0.5,\n", HEADER);

        let results: Vec<_> = TransactionReader::from_reader(input.as_bytes()).collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(BankError::Parse { line: Some(3), .. })
        ));
        assert_eq!(results[2].as_ref().unwrap().kind, TransactionType::Fee);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let input = format!("{}  transfer , 1 , 2 , 3.00 , Gift \n", HEADER);

        let tx = TransactionReader::from_reader(input.as_bytes())
            .next()
            .unwrap()
            .unwrap();

        assert_eq!(tx.source, Some(1));
        assert_eq!(tx.destination, Some(2));
        assert_eq!(tx.title, "Gift");
    }

    #[test]
    fn test_empty_input() {
        let mut reader = TransactionReader::from_reader(HEADER.as_bytes());

        assert!(reader.next().is_none());
    }
}
