//! Data contract between the engine and a request adapter.
//!
//! The adapter itself (HTTP routing, status-code mapping) lives outside this
//! crate; these types pin down the shapes it exchanges with the engine.
//! Amounts cross the boundary as decimal strings.

use crate::domain::account::AccountId;
use crate::domain::transaction::{Transaction, TransactionId, TransferStatus};
use crate::error::TransferError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An inbound transfer request, as deserialized by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCommand {
    pub source_account_id: AccountId,
    pub dest_account_id: AccountId,
    pub amount: Decimal,
}

/// The success payload for a completed transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transaction_id: TransactionId,
    pub source_account_id: AccountId,
    pub dest_account_id: AccountId,
    pub amount: Decimal,
    pub status: TransferStatus,
    pub timestamp: DateTime<Utc>,
}

impl From<&Transaction> for TransferReceipt {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            source_account_id: tx.source.clone(),
            dest_account_id: tx.dest.clone(),
            amount: tx.amount.value(),
            status: tx.status,
            timestamp: tx.timestamp,
        }
    }
}

/// The failure payload: a machine-readable kind plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRejection {
    pub error_kind: String,
    pub message: String,
}

impl From<&TransferError> for TransferRejection {
    fn from(err: &TransferError) -> Self {
        Self {
            error_kind: err.kind().to_owned(),
            message: err.to_string(),
        }
    }
}
