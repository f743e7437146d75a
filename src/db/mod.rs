//! SQLite storage for the ledger.
//!
//! `schema` opens the database and applies the embedded schema; `repo` holds
//! the queries and the write-gated transaction every mutation runs in.

pub mod repo;
pub mod schema;

pub use repo::{DayTotals, LedgerTx, NewCycle, NewDay, NewPurchase, NewSale, Repository};
pub use schema::open_ledger_db;
