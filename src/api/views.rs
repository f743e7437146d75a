//! JSON views of ledger records.
//!
//! Decimals leave the service as strings rounded for presentation: USD to
//! 2 places, quantities to 8, prices to 4 and percentages to 2.

use serde::Serialize;

use crate::domain::{Cycle, CycleId, CycleSelector, Day, Decimal, Purchase, Sale, VaultPosition};
use crate::engine::{PriceAssessment, PriceQuote};
use crate::error::AppError;

pub fn usd(value: Decimal) -> String {
    value.round_usd().to_canonical_string()
}

pub fn qty(value: Decimal) -> String {
    value.round_qty().to_canonical_string()
}

pub fn price(value: Decimal) -> String {
    value.round_price().to_canonical_string()
}

pub fn pct(value: Decimal) -> String {
    value.round_pct().to_canonical_string()
}

/// Parse a cycle reference from a path or query: an id or `active`.
pub fn parse_cycle_ref(raw: &str) -> Result<CycleSelector, AppError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("active") {
        return Ok(CycleSelector::Active);
    }
    raw.parse::<i64>()
        .map(|id| CycleSelector::Id(CycleId::new(id)))
        .map_err(|_| AppError::BadRequest(format!("invalid cycle reference: {}", raw)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleView {
    pub id: i64,
    pub start_date: String,
    pub estimated_end_date: String,
    pub planned_days: i64,
    pub operated_days: i64,
    pub days_remaining: i64,
    pub completed: bool,
    pub initial_investment: String,
    pub final_capital: Option<String>,
    pub total_profit: String,
    pub total_roi_pct: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub closed_at: Option<i64>,
}

impl From<&Cycle> for CycleView {
    fn from(c: &Cycle) -> Self {
        CycleView {
            id: c.id.as_i64(),
            start_date: c.start_date.to_string(),
            estimated_end_date: c.estimated_end_date().to_string(),
            planned_days: c.planned_days,
            operated_days: c.operated_days,
            days_remaining: c.days_remaining(),
            completed: c.is_completed(),
            initial_investment: usd(c.initial_investment),
            final_capital: c.final_capital.map(usd),
            total_profit: usd(c.total_profit),
            total_roi_pct: c.total_roi_pct.map(pct),
            status: c.status.to_string(),
            created_at: c.created_at.as_ms(),
            closed_at: c.closed_at.map(|t| t.as_ms()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub id: i64,
    pub cycle_id: i64,
    pub day_number: i64,
    pub open_time: i64,
    pub close_time: Option<i64>,
    pub initial_capital: String,
    pub final_capital: Option<String>,
    pub asset: Option<String>,
    pub published_price: Option<String>,
    pub commissions_paid: String,
    pub gross_profit: String,
    pub net_profit: String,
    pub cash_received: String,
    pub cash_reinvested: bool,
    pub status: String,
}

impl From<&Day> for DayView {
    fn from(d: &Day) -> Self {
        DayView {
            id: d.id.as_i64(),
            cycle_id: d.cycle_id.as_i64(),
            day_number: d.day_number,
            open_time: d.open_time.as_ms(),
            close_time: d.close_time.map(|t| t.as_ms()),
            initial_capital: usd(d.initial_capital),
            final_capital: d.final_capital.map(usd),
            asset: d.asset.as_ref().map(|a| a.to_string()),
            published_price: d.published_price.map(price),
            commissions_paid: usd(d.commissions_paid),
            gross_profit: usd(d.gross_profit),
            net_profit: usd(d.net_profit),
            cash_received: usd(d.cash_received),
            cash_reinvested: d.cash_reinvested,
            status: d.status.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub cycle_id: i64,
    pub asset: String,
    pub quantity: String,
    pub average_cost: String,
    pub value: Option<String>,
}

impl From<&VaultPosition> for PositionView {
    fn from(p: &VaultPosition) -> Self {
        PositionView {
            cycle_id: p.cycle_id.as_i64(),
            asset: p.asset.to_string(),
            quantity: qty(p.quantity),
            average_cost: price(p.average_cost),
            value: p.value().map(usd),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleView {
    pub id: i64,
    pub day_id: i64,
    pub asset: String,
    pub quantity: String,
    pub unit_price: String,
    pub cost_basis_total: String,
    pub gross_amount: String,
    pub commission: String,
    pub net_cash: String,
    pub gross_profit: String,
    pub net_profit: String,
    pub timestamp: i64,
}

impl From<&Sale> for SaleView {
    fn from(s: &Sale) -> Self {
        SaleView {
            id: s.id,
            day_id: s.day_id.as_i64(),
            asset: s.asset.to_string(),
            quantity: qty(s.quantity),
            unit_price: price(s.unit_price),
            cost_basis_total: usd(s.cost_basis_total),
            gross_amount: usd(s.gross_amount),
            commission: usd(s.commission),
            net_cash: usd(s.net_cash),
            gross_profit: usd(s.gross_profit),
            net_profit: usd(s.net_profit),
            timestamp: s.timestamp.as_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseView {
    pub id: i64,
    pub asset: String,
    pub quantity: String,
    pub usd_amount: String,
    pub rate: String,
    pub kind: String,
    pub timestamp: i64,
}

impl From<&Purchase> for PurchaseView {
    fn from(p: &Purchase) -> Self {
        PurchaseView {
            id: p.id,
            asset: p.asset.to_string(),
            quantity: qty(p.quantity),
            usd_amount: usd(p.usd_amount),
            rate: price(p.rate),
            kind: p.kind.as_str().to_string(),
            timestamp: p.timestamp.as_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub average_cost: String,
    pub suggested_price: String,
    pub breakeven_price: String,
    pub estimated_margin_pct: String,
}

impl From<&PriceQuote> for QuoteView {
    fn from(q: &PriceQuote) -> Self {
        QuoteView {
            average_cost: price(q.average_cost),
            suggested_price: price(q.suggested_price),
            breakeven_price: price(q.breakeven_price),
            estimated_margin_pct: pct(q.estimated_margin_pct),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentView {
    pub verdict: &'static str,
    pub margin_pct: Option<String>,
}

impl From<&PriceAssessment> for AssessmentView {
    fn from(a: &PriceAssessment) -> Self {
        let verdict = match a {
            PriceAssessment::Invalid => "invalid",
            PriceAssessment::Loss { .. } => "loss",
            PriceAssessment::BelowMinimum { .. } => "belowMinimum",
            PriceAssessment::Profitable { .. } => "profitable",
        };
        AssessmentView {
            verdict,
            margin_pct: a.margin_pct().map(pct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_boundary_formatting() {
        let d = |s: &str| Decimal::from_str(s).unwrap();
        assert_eq!(usd(d("0.358225")), "0.36");
        assert_eq!(price(d("1.024065540")), "1.0241");
        assert_eq!(qty(d("97.65")), "97.65");
        assert_eq!(pct(d("20")), "20");
    }

    #[test]
    fn test_parse_cycle_ref() {
        assert_eq!(parse_cycle_ref("active").unwrap(), CycleSelector::Active);
        assert_eq!(
            parse_cycle_ref("12").unwrap(),
            CycleSelector::Id(CycleId::new(12))
        );
        assert!(parse_cycle_ref("latest").is_err());
    }
}
