pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;

pub use config::Config;
pub use db::{open_ledger_db, Repository};
pub use domain::{
    AssetSymbol, Cycle, CycleId, CycleSelector, Day, DayId, Decimal, LedgerConfig, QuantitySpec,
    TimeMs,
};
pub use error::AppError;
pub use ledger::{Ledger, LedgerError};
