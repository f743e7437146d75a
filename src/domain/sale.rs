//! Sale ledger entry.

use serde::{Deserialize, Serialize};

use crate::domain::{AssetSymbol, DayId, Decimal, TimeMs};

/// A single sale recorded against an open day. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub day_id: DayId,
    pub asset: AssetSymbol,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub cost_basis_total: Decimal,
    pub gross_amount: Decimal,
    pub commission: Decimal,
    pub net_cash: Decimal,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub timestamp: TimeMs,
}
