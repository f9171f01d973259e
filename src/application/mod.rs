//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `TransferEngine`, the single entry point through
//! which balances move. It validates requests, reads committed account state,
//! and drives the ledger's atomic commit with a bounded retry loop around
//! optimistic-concurrency conflicts.

pub mod engine;
