use crate::domain::account::{Account, AccountId, AccountUpdate, Amount};
use crate::domain::ports::LedgerBox;
use crate::domain::transaction::{NewTransfer, Transaction};
use crate::error::{Result, TransferError};
use rust_decimal::Decimal;

/// Maximum number of commit attempts per transfer before a
/// `ConcurrencyConflict` is surfaced to the caller. Conflicts are the only
/// retried failure; every other kind is deterministic for the same inputs.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Moves funds between two accounts as a single atomic operation.
///
/// `TransferEngine` owns the ledger backend and ensures that a transfer
/// either debits the source, credits the destination, and appends exactly one
/// transaction record, or leaves the ledger byte-for-byte unchanged and
/// reports one of the enumerated failure kinds.
pub struct TransferEngine {
    ledger: LedgerBox,
}

impl TransferEngine {
    pub fn new(ledger: LedgerBox) -> Self {
        Self { ledger }
    }

    /// Executes a transfer of `amount` from `source` to `dest`.
    ///
    /// Shape checks run first, in order, before any storage access: the
    /// same-account check, then amount validation. Malformed requests never
    /// contend for account locks. Existence and balance sufficiency are then
    /// checked against committed state, and the version-stamped commit
    /// re-validates that nothing moved underneath us; a stale read is retried
    /// from scratch up to [`MAX_COMMIT_ATTEMPTS`] times.
    pub async fn transfer(
        &self,
        source: &AccountId,
        dest: &AccountId,
        amount: Decimal,
    ) -> Result<Transaction> {
        if source == dest {
            return Err(TransferError::SameAccount);
        }
        let amount = Amount::new(amount)?;

        let mut attempt = 1;
        loop {
            match self.try_commit(source, dest, amount).await {
                Err(TransferError::ConcurrencyConflict(id)) if attempt < MAX_COMMIT_ATTEMPTS => {
                    tracing::debug!(%source, %dest, %id, attempt, "commit conflict, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// One full validate-and-commit pass against committed state.
    async fn try_commit(
        &self,
        source: &AccountId,
        dest: &AccountId,
        amount: Amount,
    ) -> Result<Transaction> {
        let src = self.fetch(source).await?;
        let dst = self.fetch(dest).await?;

        if !src.balance.covers(amount) {
            return Err(TransferError::InsufficientFunds(source.clone()));
        }

        let debit = AccountUpdate {
            id: src.id.clone(),
            expected_version: src.version,
            new_balance: src.balance - amount,
        };
        let credit = AccountUpdate {
            id: dst.id.clone(),
            expected_version: dst.version,
            new_balance: dst.balance + amount,
        };
        let transfer = NewTransfer {
            source: src.id,
            dest: dst.id,
            amount,
        };

        self.ledger.commit_transfer(debit, credit, transfer).await
    }

    async fn fetch(&self, id: &AccountId) -> Result<Account> {
        self.ledger
            .get(id)
            .await?
            .ok_or_else(|| TransferError::AccountNotFound(id.clone()))
    }

    /// Transfer history for an account, oldest first. Fails with
    /// `AccountNotFound` rather than returning an empty history for an id
    /// that was never onboarded.
    pub async fn history(&self, account: &AccountId) -> Result<Vec<Transaction>> {
        self.fetch(account).await?;
        self.ledger.list_by_account(account).await
    }

    /// Committed snapshot of every account.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.ledger.all_accounts().await
    }

    /// Onboards an account with its opening balance. A negative opening
    /// balance is rejected; balances stay non-negative afterwards because
    /// transfers only ever debit covered amounts.
    pub async fn open_account(&self, account: Account) -> Result<()> {
        if account.balance.value() < Decimal::ZERO {
            return Err(TransferError::InvalidAmount {
                amount: account.balance.value(),
                reason: "opening balance must not be negative",
            });
        }
        self.ledger.create(account).await
    }
}
