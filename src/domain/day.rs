//! Day: one operating session inside a cycle.

use serde::{Deserialize, Serialize};

use crate::domain::{AssetSymbol, CycleId, DayId, Decimal, TimeMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Open,
    Closed,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Open => "open",
            DayStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(DayStatus::Open),
            "closed" => Some(DayStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A day row.
///
/// While open, `commissions_paid`, `gross_profit`, `net_profit` and
/// `cash_received` are running totals bumped by each sale. Closing recomputes
/// them from the day's sales and stamps `final_capital`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub id: DayId,
    pub cycle_id: CycleId,
    pub day_number: i64,
    pub open_time: TimeMs,
    pub close_time: Option<TimeMs>,
    pub initial_capital: Decimal,
    pub final_capital: Option<Decimal>,
    pub asset: Option<AssetSymbol>,
    pub published_price: Option<Decimal>,
    pub commissions_paid: Decimal,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub cash_received: Decimal,
    pub cash_reinvested: bool,
    pub status: DayStatus,
}

impl Day {
    pub fn is_open(&self) -> bool {
        self.status == DayStatus::Open
    }
}
