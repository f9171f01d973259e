use crate::domain::account::AccountId;
use crate::error::{Result, TransferError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One `source,dest,amount` row. The amount is validated by the engine, not
/// here, so an out-of-range value still produces a row that fails with a
/// precise reason instead of a parse error.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TransferRow {
    pub source: AccountId,
    pub dest: AccountId,
    pub amount: Decimal,
}

/// Reads transfer commands from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<TransferRow>`,
/// trimming whitespace and streaming rather than loading the file whole.
pub struct TransferReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransferReader<R> {
    /// Creates a new `TransferReader` from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes transfer rows.
    pub fn transfers(self) -> impl Iterator<Item = Result<TransferRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(TransferError::from))
    }
}
