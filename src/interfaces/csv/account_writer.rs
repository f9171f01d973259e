use crate::domain::account::Account;
use crate::error::Result;
use std::io::Write;

/// Writes the final `account,balance` report.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row per account, in the order given.
    pub fn write_accounts(&mut self, accounts: &[Account]) -> Result<()> {
        self.writer.write_record(["account", "balance"])?;
        for account in accounts {
            self.writer
                .write_record([account.id.as_str(), &account.balance.to_string()])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
