use crate::domain::account::{Account, AccountId, Balance};
use crate::error::{Result, TransferError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One `account,balance` seed row.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct AccountRow {
    pub account: AccountId,
    pub balance: Decimal,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account::new(row.account, Balance::new(row.balance))
    }
}

/// Reads account seed rows from a CSV source.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    pub fn accounts(self) -> impl Iterator<Item = Result<AccountRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(TransferError::from))
    }
}
