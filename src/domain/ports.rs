use super::account::{Account, AccountId, AccountUpdate};
use super::transaction::{NewTransfer, Transaction, TransactionId};
use crate::error::Result;
use async_trait::async_trait;

/// Read and onboarding operations over account records.
///
/// Balances are only ever mutated through [`Ledger::commit_transfer`]; this
/// trait deliberately exposes no free-standing balance write.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Returns the committed snapshot of an account, if it exists.
    async fn get(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Creates an account with its opening balance. Fails with
    /// `AccountExists` on a duplicate id.
    async fn create(&self, account: Account) -> Result<()>;

    /// Consistent snapshot of every account, sorted by id: a concurrent
    /// commit is either fully reflected or not at all.
    async fn all_accounts(&self) -> Result<Vec<Account>>;
}

/// Read operations over the append-only transfer history.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn find(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// All transactions the account participated in, on either side, oldest
    /// first. Finite and restartable.
    async fn list_by_account(&self, id: &AccountId) -> Result<Vec<Transaction>>;
}

/// The unit-of-work seam between the engine and storage.
///
/// A backend implements both stores over shared state so the balance writes
/// and the log append can commit as one atomic unit.
#[async_trait]
pub trait Ledger: AccountStore + TransactionLog {
    /// Atomically applies the debit and credit and appends the transfer
    /// record, returning the stamped record.
    ///
    /// Contract:
    /// - the two accounts are locked in ascending `AccountId` order;
    /// - if either account's version no longer matches the update's
    ///   `expected_version`, fails with `ConcurrencyConflict` and applies
    ///   nothing;
    /// - if either account is missing, fails with `AccountNotFound`;
    /// - on success both balances, both version bumps, and the appended
    ///   record become visible together; no reader observes half a transfer.
    async fn commit_transfer(
        &self,
        debit: AccountUpdate,
        credit: AccountUpdate,
        transfer: NewTransfer,
    ) -> Result<Transaction>;
}

pub type LedgerBox = Box<dyn Ledger>;
