//! Vault inventory: positions per (cycle, asset) and the purchase audit trail.

use serde::{Deserialize, Serialize};

use crate::domain::{AssetSymbol, CycleId, Decimal, TimeMs};

/// Inventory of one asset held by one cycle.
///
/// `average_cost` is the weighted-average USD cost per unit. It moves only
/// when inventory comes in; withdrawals and sales leave it untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultPosition {
    pub cycle_id: CycleId,
    pub asset: AssetSymbol,
    pub quantity: Decimal,
    pub average_cost: Decimal,
}

impl VaultPosition {
    /// USD value of the position at its average cost, `None` on overflow.
    pub fn value(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.average_cost)
    }
}

/// How inventory entered a cycle's vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseKind {
    /// Fresh capital bought with USD.
    Deposit,
    /// Inventory moved in from another cycle at its average cost.
    Transfer,
    /// A closed day's cash bought back into inventory.
    Reinvest,
}

impl PurchaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseKind::Deposit => "deposit",
            PurchaseKind::Transfer => "transfer",
            PurchaseKind::Reinvest => "reinvest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(PurchaseKind::Deposit),
            "transfer" => Some(PurchaseKind::Transfer),
            "reinvest" => Some(PurchaseKind::Reinvest),
            _ => None,
        }
    }
}

/// Append-only audit record of inventory coming into a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: i64,
    pub cycle_id: CycleId,
    pub asset: AssetSymbol,
    pub quantity: Decimal,
    pub usd_amount: Decimal,
    pub rate: Decimal,
    pub kind: PurchaseKind,
    pub timestamp: TimeMs,
}
