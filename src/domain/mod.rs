//! Domain types for the arbitrage ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, CycleId, DayId, AssetSymbol
//! - Request selectors for cycles and quantities
//! - Cycle, Day, VaultPosition, Sale and Purchase records

pub mod cycle;
pub mod day;
pub mod decimal;
pub mod primitives;
pub mod sale;
pub mod settings;
pub mod vault;

pub use cycle::{Cycle, CycleStatus};
pub use day::{Day, DayStatus};
pub use decimal::Decimal;
pub use primitives::{AssetSymbol, CycleId, CycleSelector, DayId, QuantitySpec, TimeMs};
pub use sale::Sale;
pub use settings::{Asset, AssetKind, LedgerConfig};
pub use vault::{Purchase, PurchaseKind, VaultPosition};
