use crate::domain::account::{Account, AccountId, AccountUpdate};
use crate::domain::ports::{AccountStore, Ledger, TransactionLog};
use crate::domain::transaction::{NewTransfer, Transaction, TransactionId};
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Column Family for account records.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for transfer records, keyed by big-endian transaction id.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family indexing transactions by account:
/// `account_id ++ 0x00 ++ tx_id_be -> tx_id_be`.
pub const CF_TX_INDEX: &str = "tx_index";

const INDEX_SEPARATOR: u8 = 0;

/// A persistent ledger backed by RocksDB.
///
/// Balances, transfer records, and the per-account index commit through a
/// single `WriteBatch`, so a crash leaves either the whole transfer or none
/// of it. Mutual exclusion per account comes from an in-process lock table,
/// acquired in ascending id order exactly like the in-memory backend; the
/// version field still travels with each record so a stale engine read is
/// refused rather than overwritten.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbLedger {
    db: Arc<DB>,
    locks: Arc<RwLock<HashMap<AccountId, Arc<Mutex<()>>>>>,
    next_tx_id: Arc<AtomicU64>,
}

impl RocksDbLedger {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures the required column families exist and recovers the
    /// transaction id counter from the highest persisted record.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let cf_tx_index = ColumnFamilyDescriptor::new(CF_TX_INDEX, Options::default());

        let db = DB::open_cf_descriptors(
            &opts,
            path,
            vec![cf_accounts, cf_transactions, cf_tx_index],
        )?;

        let ledger = Self {
            db: Arc::new(db),
            locks: Arc::new(RwLock::new(HashMap::new())),
            next_tx_id: Arc::new(AtomicU64::new(0)),
        };
        let last_id = ledger.last_transaction_id()?;
        ledger.next_tx_id.store(last_id, Ordering::SeqCst);
        Ok(ledger)
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            TransferError::storage(std::io::Error::other(format!(
                "column family '{name}' not found"
            )))
        })
    }

    fn last_transaction_id(&self) -> Result<TransactionId> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        let mut iter = self.db.iterator_cf(cf, IteratorMode::End);
        match iter.next() {
            Some(item) => {
                let (key, _value) = item?;
                let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    TransferError::storage(std::io::Error::other("malformed transaction key"))
                })?;
                Ok(TransactionId::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }

    fn read_account(&self, id: &AccountId) -> Result<Option<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, id.as_str().as_bytes())? {
            Some(bytes) => {
                let account = serde_json::from_slice(&bytes).map_err(TransferError::storage)?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Lock-table entry for an account, created on demand so that accounts
    /// persisted by a previous process get an entry on first use.
    async fn lock_entry(&self, id: &AccountId) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(entry) = locks.get(id) {
                return entry.clone();
            }
        }
        let mut locks = self.locks.write().await;
        locks.entry(id.clone()).or_default().clone()
    }

    fn index_key(account: &AccountId, tx_id: TransactionId) -> Vec<u8> {
        let mut key = Vec::with_capacity(account.as_str().len() + 9);
        key.extend_from_slice(account.as_str().as_bytes());
        key.push(INDEX_SEPARATOR);
        key.extend_from_slice(&tx_id.to_be_bytes());
        key
    }
}

#[async_trait]
impl AccountStore for RocksDbLedger {
    async fn get(&self, id: &AccountId) -> Result<Option<Account>> {
        self.read_account(id)
    }

    async fn create(&self, account: Account) -> Result<()> {
        // The table write lock doubles as the uniqueness guard.
        let mut locks = self.locks.write().await;
        if self.read_account(&account.id)?.is_some() {
            return Err(TransferError::AccountExists(account.id));
        }
        let cf = self.cf(CF_ACCOUNTS)?;
        let value = serde_json::to_vec(&account).map_err(TransferError::storage)?;
        self.db.put_cf(cf, account.id.as_str().as_bytes(), value)?;
        locks.entry(account.id).or_default();
        Ok(())
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let account: Account =
                serde_json::from_slice(&value).map_err(TransferError::storage)?;
            accounts.push(account);
        }
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }
}

#[async_trait]
impl TransactionLog for RocksDbLedger {
    async fn find(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => {
                let tx = serde_json::from_slice(&bytes).map_err(TransferError::storage)?;
                Ok(Some(tx))
            }
            None => Ok(None),
        }
    }

    async fn list_by_account(&self, id: &AccountId) -> Result<Vec<Transaction>> {
        let cf = self.cf(CF_TX_INDEX)?;
        let mut prefix = id.as_str().as_bytes().to_vec();
        prefix.push(INDEX_SEPARATOR);

        let mut transactions = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_slice(), Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let bytes: [u8; 8] = value.as_ref().try_into().map_err(|_| {
                TransferError::storage(std::io::Error::other("malformed index entry"))
            })?;
            let tx_id = TransactionId::from_be_bytes(bytes);
            if let Some(tx) = self.find(tx_id).await? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }
}

#[async_trait]
impl Ledger for RocksDbLedger {
    async fn commit_transfer(
        &self,
        debit: AccountUpdate,
        credit: AccountUpdate,
        transfer: NewTransfer,
    ) -> Result<Transaction> {
        let (first, second) = if debit.id <= credit.id {
            (&debit, &credit)
        } else {
            (&credit, &debit)
        };

        let first_entry = self.lock_entry(&first.id).await;
        let second_entry = self.lock_entry(&second.id).await;
        let _first_guard = first_entry.lock().await;
        let _second_guard = second_entry.lock().await;

        let mut first_account = self
            .read_account(&first.id)?
            .ok_or_else(|| TransferError::AccountNotFound(first.id.clone()))?;
        let mut second_account = self
            .read_account(&second.id)?
            .ok_or_else(|| TransferError::AccountNotFound(second.id.clone()))?;

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

        let tx_id = self.next_tx_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = transfer.into_record(tx_id, Utc::now());

        let cf_accounts = self.cf(CF_ACCOUNTS)?;
        let cf_transactions = self.cf(CF_TRANSACTIONS)?;
        let cf_tx_index = self.cf(CF_TX_INDEX)?;

        let mut batch = WriteBatch::default();
        for account in [&first_account, &second_account] {
            let value = serde_json::to_vec(account).map_err(TransferError::storage)?;
            batch.put_cf(cf_accounts, account.id.as_str().as_bytes(), value);
        }
        let tx_value = serde_json::to_vec(&record).map_err(TransferError::storage)?;
        batch.put_cf(cf_transactions, record.id.to_be_bytes(), tx_value);
        batch.put_cf(
            cf_tx_index,
            Self::index_key(&record.source, record.id),
            record.id.to_be_bytes(),
        );
        batch.put_cf(
            cf_tx_index,
            Self::index_key(&record.dest, record.id),
            record.id.to_be_bytes(),
        );
        self.db.write(batch)?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Amount, Balance};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn account(id: &str, balance: rust_decimal::Decimal) -> Account {
        Account::new(AccountId::from(id), Balance::new(balance))
    }

    async fn commit(
        ledger: &RocksDbLedger,
        source: &str,
        dest: &str,
        amount: rust_decimal::Decimal,
    ) -> Result<Transaction> {
        let src = ledger.get(&AccountId::from(source)).await?.unwrap();
        let dst = ledger.get(&AccountId::from(dest)).await?.unwrap();
        let amount = Amount::new(amount)?;
        ledger
            .commit_transfer(
                AccountUpdate {
                    id: src.id.clone(),
                    expected_version: src.version,
                    new_balance: src.balance - amount,
                },
                AccountUpdate {
                    id: dst.id.clone(),
                    expected_version: dst.version,
                    new_balance: dst.balance + amount,
                },
                NewTransfer {
                    source: src.id,
                    dest: dst.id,
                    amount,
                },
            )
            .await
    }

    #[tokio::test]
    async fn test_open_creates_column_families() {
        let dir = tempdir().unwrap();
        let ledger = RocksDbLedger::open(dir.path()).expect("Failed to open RocksDB");

        assert!(ledger.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(ledger.db.cf_handle(CF_TRANSACTIONS).is_some());
        assert!(ledger.db.cf_handle(CF_TX_INDEX).is_some());
    }

    #[tokio::test]
    async fn test_create_and_duplicate() {
        let dir = tempdir().unwrap();
        let ledger = RocksDbLedger::open(dir.path()).unwrap();

        ledger.create(account("A", dec!(100.00))).await.unwrap();
        let result = ledger.create(account("A", dec!(1.00))).await;
        assert!(matches!(result, Err(TransferError::AccountExists(_))));

        let stored = ledger.get(&AccountId::from("A")).await.unwrap().unwrap();
        assert_eq!(stored.balance, Balance::new(dec!(100.00)));
    }

    #[tokio::test]
    async fn test_commit_and_index() {
        let dir = tempdir().unwrap();
        let ledger = RocksDbLedger::open(dir.path()).unwrap();
        ledger.create(account("A", dec!(100.00))).await.unwrap();
        ledger.create(account("B", dec!(0.00))).await.unwrap();

        let record = commit(&ledger, "A", "B", dec!(40.00)).await.unwrap();
        assert_eq!(record.id, 1);

        let a = ledger.get(&AccountId::from("A")).await.unwrap().unwrap();
        assert_eq!(a.balance, Balance::new(dec!(60.00)));
        assert_eq!(a.version, 1);

        for id in ["A", "B"] {
            let history = ledger.list_by_account(&AccountId::from(id)).await.unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0], record);
        }
    }

    #[tokio::test]
    async fn test_stale_version_refused() {
        let dir = tempdir().unwrap();
        let ledger = RocksDbLedger::open(dir.path()).unwrap();
        ledger.create(account("A", dec!(100.00))).await.unwrap();
        ledger.create(account("B", dec!(0.00))).await.unwrap();

        let result = ledger
            .commit_transfer(
                AccountUpdate {
                    id: AccountId::from("A"),
                    expected_version: 9,
                    new_balance: Balance::new(dec!(60.00)),
                },
                AccountUpdate {
                    id: AccountId::from("B"),
                    expected_version: 0,
                    new_balance: Balance::new(dec!(40.00)),
                },
                NewTransfer {
                    source: AccountId::from("A"),
                    dest: AccountId::from("B"),
                    amount: Amount::new(dec!(40.00)).unwrap(),
                },
            )
            .await;
        assert!(matches!(result, Err(TransferError::ConcurrencyConflict(_))));

        let a = ledger.get(&AccountId::from("A")).await.unwrap().unwrap();
        assert_eq!(a.balance, Balance::new(dec!(100.00)));
        assert!(
            ledger
                .list_by_account(&AccountId::from("A"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_id_counter_recovers_after_reopen() {
        let dir = tempdir().unwrap();
        {
            let ledger = RocksDbLedger::open(dir.path()).unwrap();
            ledger.create(account("A", dec!(100.00))).await.unwrap();
            ledger.create(account("B", dec!(0.00))).await.unwrap();
            commit(&ledger, "A", "B", dec!(10.00)).await.unwrap();
            commit(&ledger, "A", "B", dec!(10.00)).await.unwrap();
        }

        let ledger = RocksDbLedger::open(dir.path()).unwrap();
        let record = commit(&ledger, "A", "B", dec!(10.00)).await.unwrap();
        assert_eq!(record.id, 3);

        let a = ledger.get(&AccountId::from("A")).await.unwrap().unwrap();
        assert_eq!(a.balance, Balance::new(dec!(70.00)));
    }
}
