use crate::domain::account::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T, E = TransferError> = std::result::Result<T, E>;

/// Every failure of the transfer engine maps to exactly one of these kinds,
/// so callers (the request adapter) can branch deterministically.
///
/// None of the variants implies a partial mutation: a transfer either commits
/// in full or leaves the ledger untouched.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The id does not resolve to an existing account.
    #[error("account '{0}' not found")]
    AccountNotFound(AccountId),

    /// Source and destination are the same account.
    #[error("source and destination accounts must differ")]
    SameAccount,

    /// Amount is zero, negative, or exceeds the minor-unit precision.
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Decimal, reason: &'static str },

    /// The source balance cannot cover the requested amount.
    #[error("insufficient funds in account '{0}'")]
    InsufficientFunds(AccountId),

    /// A concurrent mutation was committed between the engine's read and its
    /// commit attempt. Safe to retry from scratch; no effect was applied.
    #[error("conflicting concurrent update on account '{0}'")]
    ConcurrencyConflict(AccountId),

    /// Onboarding collision: an account with this id already exists.
    #[error("account '{0}' already exists")]
    AccountExists(AccountId),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Fault in a storage backend, unrelated to transfer semantics.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransferError {
    /// Wraps an arbitrary backend fault into the storage variant.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }

    /// Machine-readable kind for the adapter-facing failure payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::SameAccount => "SAME_ACCOUNT",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::AccountExists(_) => "ACCOUNT_EXISTS",
            Self::Csv(_) | Self::Io(_) | Self::Storage(_) => "INTERNAL",
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for TransferError {
    fn from(err: rocksdb::Error) -> Self {
        Self::storage(err)
    }
}
