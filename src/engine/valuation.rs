//! Valuation functions: weighted-average cost, pricing, sale breakdowns, ROI.
//!
//! Everything here is pure and runs at full `Decimal` precision. Degenerate
//! inputs (non-positive cost, zero denominators) yield a zero sentinel rather
//! than an error; the ledger services reject such inputs before calling in.
//! `None` means a figure left the `Decimal` range.

use crate::domain::Decimal;

/// Net margin below which a published price is flagged as too thin, in percent.
pub const MIN_MARGIN_PCT: Decimal = Decimal::from_scaled(5, 1);

/// Per-sale money flow derived from quantity, cost and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleBreakdown {
    pub cost_total: Decimal,
    pub gross_amount: Decimal,
    pub commission: Decimal,
    pub net_cash: Decimal,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
}

/// Verdict on a candidate sale price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceAssessment {
    /// Cost or price is not positive.
    Invalid,
    /// Selling at this price loses money after commission.
    Loss { margin_pct: Decimal },
    /// Profitable, but under the minimum margin.
    BelowMinimum { margin_pct: Decimal },
    Profitable { margin_pct: Decimal },
}

impl PriceAssessment {
    pub fn margin_pct(&self) -> Option<Decimal> {
        match self {
            PriceAssessment::Invalid => None,
            PriceAssessment::Loss { margin_pct }
            | PriceAssessment::BelowMinimum { margin_pct }
            | PriceAssessment::Profitable { margin_pct } => Some(*margin_pct),
        }
    }

    pub fn is_profitable(&self) -> bool {
        matches!(self, PriceAssessment::Profitable { .. })
    }
}

/// Pricing summary for a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub average_cost: Decimal,
    pub suggested_price: Decimal,
    pub breakeven_price: Decimal,
    pub estimated_margin_pct: Decimal,
}

fn pct(value: Decimal) -> Decimal {
    value / Decimal::hundred()
}

/// Weighted-average unit cost after adding `qty_new` units at `cost_new`.
///
/// Zero total quantity averages to 0. Returns `None` on overflow.
pub fn weighted_average(
    qty_old: Decimal,
    cost_old: Decimal,
    qty_new: Decimal,
    cost_new: Decimal,
) -> Option<Decimal> {
    let total_qty = qty_old.checked_add(qty_new)?;
    if total_qty.is_zero() {
        return Some(Decimal::zero());
    }
    let total_cost = qty_old
        .checked_mul(cost_old)?
        .checked_add(qty_new.checked_mul(cost_new)?)?;
    total_cost.checked_div(total_qty)
}

/// Price that leaves `target_profit_pct` after paying `commission_pct`.
pub fn suggested_price(
    avg_cost: Decimal,
    target_profit_pct: Decimal,
    commission_pct: Decimal,
) -> Option<Decimal> {
    if !avg_cost.is_positive() {
        return Some(Decimal::zero());
    }
    let divisor = Decimal::one().checked_sub(pct(commission_pct.checked_add(target_profit_pct)?))?;
    if !divisor.is_positive() {
        return Some(Decimal::zero());
    }
    avg_cost.checked_div(divisor)
}

/// Net margin (percent of cost) of selling at `sale_price` after commission.
pub fn estimated_net_margin_pct(
    avg_cost: Decimal,
    sale_price: Decimal,
    commission_pct: Decimal,
) -> Option<Decimal> {
    if !avg_cost.is_positive() || !sale_price.is_positive() {
        return Some(Decimal::zero());
    }
    let net_price = sale_price.checked_mul(Decimal::one().checked_sub(pct(commission_pct))?)?;
    net_price
        .checked_sub(avg_cost)?
        .checked_div(avg_cost)?
        .checked_mul(Decimal::hundred())
}

/// Lowest price that recovers cost after commission.
pub fn breakeven_price(avg_cost: Decimal, commission_pct: Decimal) -> Option<Decimal> {
    if !avg_cost.is_positive() {
        return Some(Decimal::zero());
    }
    let divisor = Decimal::one().checked_sub(pct(commission_pct))?;
    if !divisor.is_positive() {
        return Some(Decimal::zero());
    }
    avg_cost.checked_div(divisor)
}

/// Money flow of selling `qty` units bought at `avg_cost` for `sale_price`.
///
/// Returns `None` when quantity or price is not positive, cost is negative,
/// or one of the amounts overflows.
pub fn sale_breakdown(
    qty: Decimal,
    avg_cost: Decimal,
    sale_price: Decimal,
    commission_pct: Decimal,
) -> Option<SaleBreakdown> {
    if !qty.is_positive() || !sale_price.is_positive() || avg_cost.is_negative() {
        return None;
    }

    let cost_total = qty.checked_mul(avg_cost)?;
    let gross_amount = qty.checked_mul(sale_price)?;
    let commission = gross_amount.checked_mul(pct(commission_pct))?;
    let net_cash = gross_amount.checked_sub(commission)?;

    Some(SaleBreakdown {
        cost_total,
        gross_amount,
        commission,
        net_cash,
        gross_profit: gross_amount.checked_sub(cost_total)?,
        net_profit: net_cash.checked_sub(cost_total)?,
    })
}

/// Return on investment in percent; 0 when there was nothing invested.
pub fn roi(profit: Decimal, investment: Decimal) -> Option<Decimal> {
    if !investment.is_positive() {
        return Some(Decimal::zero());
    }
    profit.checked_div(investment)?.checked_mul(Decimal::hundred())
}

pub fn daily_roi_average(roi_total: Decimal, days: i64) -> Decimal {
    if days <= 0 {
        return Decimal::zero();
    }
    roi_total / Decimal::from_i64(days)
}

/// Classify `sale_price` against cost, commission and the minimum margin.
pub fn assess_price(
    avg_cost: Decimal,
    sale_price: Decimal,
    commission_pct: Decimal,
    min_margin_pct: Decimal,
) -> Option<PriceAssessment> {
    if !avg_cost.is_positive() || !sale_price.is_positive() {
        return Some(PriceAssessment::Invalid);
    }
    let margin_pct = estimated_net_margin_pct(avg_cost, sale_price, commission_pct)?;
    Some(if margin_pct.is_negative() {
        PriceAssessment::Loss { margin_pct }
    } else if margin_pct < min_margin_pct {
        PriceAssessment::BelowMinimum { margin_pct }
    } else {
        PriceAssessment::Profitable { margin_pct }
    })
}

pub fn price_quote(
    avg_cost: Decimal,
    target_profit_pct: Decimal,
    commission_pct: Decimal,
) -> Option<PriceQuote> {
    let suggested = suggested_price(avg_cost, target_profit_pct, commission_pct)?;
    Some(PriceQuote {
        average_cost: avg_cost,
        suggested_price: suggested,
        breakeven_price: breakeven_price(avg_cost, commission_pct)?,
        estimated_margin_pct: estimated_net_margin_pct(avg_cost, suggested, commission_pct)?,
    })
}
