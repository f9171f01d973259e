use clap::Parser;
use ledger_engine::application::engine::TransferEngine;
use ledger_engine::domain::ports::LedgerBox;
use ledger_engine::error::TransferError;
use ledger_engine::infrastructure::in_memory::InMemoryLedger;
use ledger_engine::interfaces::csv::account_reader::AccountReader;
use ledger_engine::interfaces::csv::account_writer::AccountWriter;
use ledger_engine::interfaces::csv::transfer_reader::TransferReader;
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Account seed CSV file (account,balance)
    accounts: PathBuf,

    /// Transfer commands CSV file (source,dest,amount)
    transfers: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerBox> {
    match db_path {
        None => Ok(Box::new(InMemoryLedger::new())),
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let ledger = ledger_engine::infrastructure::rocksdb::RocksDbLedger::open(path)
                .into_diagnostic()?;
            Ok(Box::new(ledger))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => Err(miette!(
            "--db-path requires building with the 'storage-rocksdb' feature"
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = TransferEngine::new(open_ledger(cli.db_path)?);

    // Seed accounts. Re-seeding a persistent ledger keeps the stored
    // balances instead of resetting them.
    let seed_file = File::open(cli.accounts).into_diagnostic()?;
    for row in AccountReader::new(seed_file).accounts() {
        match row {
            Ok(row) => match engine.open_account(row.into()).await {
                Ok(()) => {}
                Err(TransferError::AccountExists(id)) => {
                    tracing::debug!(%id, "account already onboarded, keeping stored balance");
                }
                Err(e @ TransferError::InvalidAmount { .. }) => {
                    tracing::warn!(kind = e.kind(), "skipping account row: {e}");
                }
                Err(e) => return Err(e).into_diagnostic(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed account row");
            }
        }
    }

    // Apply transfers. A failed transfer leaves the ledger untouched, so
    // processing simply continues with the next command.
    let transfers_file = File::open(cli.transfers).into_diagnostic()?;
    for row in TransferReader::new(transfers_file).transfers() {
        match row {
            Ok(row) => {
                if let Err(e) = engine.transfer(&row.source, &row.dest, row.amount).await {
                    tracing::warn!(
                        source = %row.source,
                        dest = %row.dest,
                        amount = %row.amount,
                        kind = e.kind(),
                        "transfer rejected: {e}"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed transfer row");
            }
        }
    }

    // Final balances.
    let accounts = engine.accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(&accounts).into_diagnostic()?;

    Ok(())
}
