use crate::domain::account::{Account, AccountId, AccountUpdate};
use crate::domain::ports::{AccountStore, Ledger, TransactionLog};
use crate::domain::transaction::{NewTransfer, Transaction, TransactionId};
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Append-only transfer history with a per-account index.
#[derive(Default)]
struct LogInner {
    next_id: TransactionId,
    by_id: HashMap<TransactionId, Transaction>,
    by_account: HashMap<AccountId, Vec<TransactionId>>,
}

impl LogInner {
    fn append(&mut self, transfer: NewTransfer) -> Transaction {
        self.next_id += 1;
        let record = transfer.into_record(self.next_id, Utc::now());
        self.by_account
            .entry(record.source.clone())
            .or_default()
            .push(record.id);
        self.by_account
            .entry(record.dest.clone())
            .or_default()
            .push(record.id);
        self.by_id.insert(record.id, record.clone());
        record
    }
}

/// A thread-safe in-memory ledger.
///
/// Each account lives behind its own `Arc<Mutex<_>>`, so transfers touching
/// disjoint account pairs never contend with each other; the outer `RwLock`
/// only guards the map structure itself. The transaction log sits behind a
/// separate lock and is appended to while both account locks are held, which
/// keeps the record and the balance writes visible as one unit.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    accounts: Arc<RwLock<HashMap<AccountId, Arc<Mutex<Account>>>>>,
    log: Arc<RwLock<LogInner>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    async fn cell(&self, id: &AccountId) -> Result<Arc<Mutex<Account>>> {
        let accounts = self.accounts.read().await;
        accounts
            .get(id)
            .cloned()
            .ok_or_else(|| TransferError::AccountNotFound(id.clone()))
    }
}

#[async_trait]
impl AccountStore for InMemoryLedger {
    async fn get(&self, id: &AccountId) -> Result<Option<Account>> {
        let cell = {
            let accounts = self.accounts.read().await;
            accounts.get(id).cloned()
        };
        match cell {
            Some(cell) => Ok(Some(cell.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn create(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(TransferError::AccountExists(account.id));
        }
        accounts.insert(account.id.clone(), Arc::new(Mutex::new(account)));
        Ok(())
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let mut cells: Vec<(AccountId, Arc<Mutex<Account>>)> = {
            let accounts = self.accounts.read().await;
            accounts
                .iter()
                .map(|(id, cell)| (id.clone(), cell.clone()))
                .collect()
        };
        cells.sort_by(|a, b| a.0.cmp(&b.0));

        // All cells are locked, in the same ascending order commits use,
        // before any balance is read: the snapshot cannot straddle a commit.
        let mut guards = Vec::with_capacity(cells.len());
        for (_, cell) in &cells {
            guards.push(cell.lock().await);
        }
        Ok(guards.iter().map(|guard| (**guard).clone()).collect())
    }
}

#[async_trait]
impl TransactionLog for InMemoryLedger {
    async fn find(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let log = self.log.read().await;
        Ok(log.by_id.get(&id).cloned())
    }

    async fn list_by_account(&self, id: &AccountId) -> Result<Vec<Transaction>> {
        let log = self.log.read().await;
        let ids = log.by_account.get(id).map(Vec::as_slice).unwrap_or(&[]);
        // Ids are assigned in append order, so the index is already oldest
        // first.
        Ok(ids.iter().filter_map(|tx| log.by_id.get(tx).cloned()).collect())
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn commit_transfer(
        &self,
        debit: AccountUpdate,
        credit: AccountUpdate,
        transfer: NewTransfer,
    ) -> Result<Transaction> {
        // Fixed global acquisition order: always the smaller id first.
        let (first, second) = if debit.id <= credit.id {
            (&debit, &credit)
        } else {
            (&credit, &debit)
        };

        let first_cell = self.cell(&first.id).await?;
        let second_cell = self.cell(&second.id).await?;

        let mut first_account = first_cell.lock().await;
        let mut second_account = second_cell.lock().await;

        // Version re-check under the locks: a mismatch means someone else
        // committed since the engine's read, and the caller must re-validate.
        if first_account.version != first.expected_version {
            return Err(TransferError::ConcurrencyConflict(first.id.clone()));
        }
        if second_account.version != second.expected_version {
            return Err(TransferError::ConcurrencyConflict(second.id.clone()));
        }

        first_account.balance = first.new_balance;
        first_account.version += 1;
        second_account.balance = second.new_balance;
        second_account.version += 1;

        // Appended while both account locks are still held, so no reader can
        // see the balances without the record or vice versa.
        let mut log = self.log.write().await;
        Ok(log.append(transfer))
    }
}
