//! Application layer orchestrating the domain against the storage and
//! notification ports.
//!
//! Everything hangs off [`InstallmentEngine`](engine::InstallmentEngine); each
//! module below adds one group of operations to it.

pub mod engine;
pub mod ledger;
pub mod lifecycle;
pub mod reminders;
