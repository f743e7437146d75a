//! Cycle: a sequential accounting period grouping operating days.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{CycleId, Decimal, TimeMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Active,
    Closed,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Active => "active",
            CycleStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CycleStatus::Active),
            "closed" => Some(CycleStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cycle row.
///
/// `final_capital` and `total_roi_pct` are only set once the cycle is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub start_date: NaiveDate,
    pub planned_days: i64,
    pub operated_days: i64,
    pub initial_investment: Decimal,
    pub final_capital: Option<Decimal>,
    pub total_profit: Decimal,
    pub total_roi_pct: Option<Decimal>,
    pub status: CycleStatus,
    pub created_at: TimeMs,
    pub closed_at: Option<TimeMs>,
}

impl Cycle {
    pub fn is_active(&self) -> bool {
        self.status == CycleStatus::Active
    }

    /// Planned end of the cycle, counted from its start date.
    pub fn estimated_end_date(&self) -> NaiveDate {
        self.start_date + chrono::Duration::days(self.planned_days)
    }

    pub fn days_remaining(&self) -> i64 {
        (self.planned_days - self.operated_days).max(0)
    }

    /// Every planned day has been operated; the cycle must be extended or closed.
    pub fn is_completed(&self) -> bool {
        self.operated_days >= self.planned_days
    }
}
