use super::account::{AccountId, Amount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned sequentially by the transaction log at append time.
pub type TransactionId = u64;

/// Only successful transfers are ever persisted, so `Completed` is the single
/// status a stored record can carry. Failed attempts are reported, not logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Completed,
}

/// An immutable record of a completed transfer, retained indefinitely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub source: AccountId,
    pub dest: AccountId,
    pub amount: Amount,
    pub status: TransferStatus,
    pub timestamp: DateTime<Utc>,
}

/// The engine's commit payload. The log assigns the id and timestamp when the
/// record is appended, never before.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    pub source: AccountId,
    pub dest: AccountId,
    pub amount: Amount,
}

impl NewTransfer {
    /// Stamps the pending transfer into a durable record.
    pub fn into_record(self, id: TransactionId, timestamp: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            source: self.source,
            dest: self.dest,
            amount: self.amount,
            status: TransferStatus::Completed,
            timestamp,
        }
    }
}
