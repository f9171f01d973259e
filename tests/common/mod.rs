#![allow(dead_code)]

use ledger_engine::application::engine::TransferEngine;
use ledger_engine::domain::account::{Account, AccountId, Balance};
use ledger_engine::infrastructure::in_memory::InMemoryLedger;
use rust_decimal::Decimal;
use std::io::Error;
use std::path::Path;

/// Builds an in-memory engine with the given opening balances.
pub async fn seeded_engine(accounts: &[(&str, Decimal)]) -> TransferEngine {
    let engine = TransferEngine::new(Box::new(InMemoryLedger::new()));
    for (id, balance) in accounts {
        engine
            .open_account(Account::new(AccountId::from(*id), Balance::new(*balance)))
            .await
            .expect("seed account");
    }
    engine
}

/// Sum of all balances, for conservation checks.
pub async fn total_balance(engine: &TransferEngine) -> Decimal {
    engine
        .accounts()
        .await
        .expect("account snapshot")
        .iter()
        .map(|a| a.balance.value())
        .sum()
}

pub fn write_seed_csv(path: &Path, accounts: &[(&str, &str)]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["account", "balance"])?;
    for (id, balance) in accounts {
        wtr.write_record([*id, *balance])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_transfers_csv(path: &Path, transfers: &[(&str, &str, &str)]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["source", "dest", "amount"])?;
    for (source, dest, amount) in transfers {
        wtr.write_record([*source, *dest, *amount])?;
    }
    wtr.flush()?;
    Ok(())
}
