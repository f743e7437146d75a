//! Day lifecycle: open, price, close and reinvest operating days.

use std::sync::Arc;
use tracing::{info, warn};

use super::error::is_unique_violation;
use super::vault::{deposit_in_tx, require_asset, value_in_tx, DepositReceipt, InvestmentPolicy};
use super::{load_cycle, resolve_cycle, LedgerError};
use crate::db::{DayTotals, NewDay, Repository};
use crate::domain::{
    AssetSymbol, CycleSelector, Day, DayId, Decimal, PurchaseKind, Sale, TimeMs,
};
use crate::engine::{assess_price, price_quote, roi, PriceAssessment, PriceQuote, MIN_MARGIN_PCT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCloseSummary {
    pub day: Day,
    pub final_capital: Decimal,
    pub net_profit: Decimal,
    pub gross_profit: Decimal,
    pub commissions_paid: Decimal,
    pub cash_received: Decimal,
    pub sales_count: i64,
    /// Net profit relative to the day's opening capital, in percent.
    pub roi_pct: Decimal,
}

/// Result of publishing a sale price for a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedDay {
    pub day: Day,
    pub quote: PriceQuote,
    pub assessment: PriceAssessment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReinvestReceipt {
    pub day: Day,
    pub deposit: DepositReceipt,
}

/// Opens and closes days. A cycle has at most one open day.
#[derive(Clone)]
pub struct DayLifecycle {
    repo: Arc<Repository>,
}

impl DayLifecycle {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Open the next day of an active cycle.
    ///
    /// The day is numbered after the cycle's last day and starts with the
    /// cycle's current vault value as its capital.
    ///
    /// # Errors
    /// - `NoActiveCycle` if the cycle is closed
    /// - `CycleCompleted` once every planned day has been operated
    /// - `DayAlreadyOpen` if the cycle already has an open day
    /// - `AssetNotFound` for an asset outside the catalog
    pub async fn open_day(
        &self,
        cycle: CycleSelector,
        asset: Option<&AssetSymbol>,
        published_price: Option<Decimal>,
    ) -> Result<Day, LedgerError> {
        if let Some(price) = published_price {
            if !price.is_positive() {
                return Err(LedgerError::invalid("published price must be positive"));
            }
            if asset.is_none() {
                return Err(LedgerError::invalid(
                    "a published price needs the asset it applies to",
                ));
            }
        }

        let mut tx = self.repo.begin_write().await?;
        let cycle = resolve_cycle(&mut tx, cycle).await?;
        if !cycle.is_active() {
            return Err(LedgerError::NoActiveCycle(Some(cycle.id)));
        }
        if cycle.is_completed() {
            warn!(
                cycle_id = %cycle.id,
                operated_days = cycle.operated_days,
                planned_days = cycle.planned_days,
                "Cycle completed; refusing to open another day"
            );
            return Err(LedgerError::CycleCompleted {
                cycle_id: cycle.id,
                planned_days: cycle.planned_days,
            });
        }
        if let Some(open) = tx.open_day_of(cycle.id).await? {
            return Err(LedgerError::DayAlreadyOpen {
                cycle_id: cycle.id,
                day_id: open.id,
            });
        }
        if let Some(asset) = asset {
            require_asset(&mut tx, asset).await?;
        }

        let new_day = NewDay {
            cycle_id: cycle.id,
            day_number: tx.max_day_number(cycle.id).await? + 1,
            open_time: TimeMs::now(),
            initial_capital: value_in_tx(&mut tx, cycle.id).await?,
            asset: asset.cloned(),
            published_price,
        };
        let day = match tx.insert_day(&new_day).await {
            Ok(day) => day,
            Err(e) if is_unique_violation(&e) => {
                return Err(match tx.open_day_of(cycle.id).await? {
                    Some(open) => LedgerError::DayAlreadyOpen {
                        cycle_id: cycle.id,
                        day_id: open.id,
                    },
                    None => LedgerError::Storage(e),
                });
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;

        info!(
            cycle_id = %cycle.id,
            day_id = %day.id,
            day_number = day.day_number,
            initial_capital = %day.initial_capital,
            "Day opened"
        );
        Ok(day)
    }

    /// Close an open day, settling its totals from the recorded sales.
    ///
    /// The parent cycle's operated days and total profit move with it.
    ///
    /// # Errors
    /// - `DayNotFound` for an unknown id
    /// - `DayNotOpen` if the day was already closed
    pub async fn close_day(&self, day_id: DayId) -> Result<DayCloseSummary, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        let day = tx.day(day_id).await?.ok_or(LedgerError::DayNotFound(day_id))?;
        if !day.is_open() {
            return Err(LedgerError::DayNotOpen(day_id));
        }

        let sales = tx.sales_of(day_id).await?;
        let totals = totals_of(&sales).ok_or_else(|| {
            LedgerError::out_of_range(format!("totals of {} sales on day {}", sales.len(), day_id))
        })?;
        let final_capital = day
            .initial_capital
            .checked_add(totals.net_profit)
            .ok_or_else(|| {
                LedgerError::out_of_range(format!(
                    "capital of {} plus profit {}",
                    day.initial_capital, totals.net_profit
                ))
            })?;
        tx.mark_day_closed(day_id, &totals, final_capital, TimeMs::now())
            .await?;

        let cycle = tx
            .cycle(day.cycle_id)
            .await?
            .ok_or(LedgerError::CycleNotFound(day.cycle_id))?;
        let total_profit = cycle
            .total_profit
            .checked_add(totals.net_profit)
            .ok_or_else(|| {
                LedgerError::out_of_range(format!(
                    "cycle {} profit of {} plus {}",
                    cycle.id, cycle.total_profit, totals.net_profit
                ))
            })?;
        tx.set_cycle_progress(cycle.id, cycle.operated_days + 1, total_profit)
            .await?;

        let closed = tx.day(day_id).await?.ok_or(LedgerError::DayNotFound(day_id))?;
        let roi_pct = roi(totals.net_profit, closed.initial_capital).ok_or_else(|| {
            LedgerError::out_of_range(format!(
                "return of {} on capital {}",
                totals.net_profit, closed.initial_capital
            ))
        })?;
        tx.commit().await?;

        info!(
            cycle_id = %closed.cycle_id,
            day_id = %day_id,
            day_number = closed.day_number,
            sales = sales.len(),
            net_profit = %totals.net_profit,
            final_capital = %final_capital,
            "Day closed"
        );
        Ok(DayCloseSummary {
            final_capital,
            net_profit: totals.net_profit,
            gross_profit: totals.gross_profit,
            commissions_paid: totals.commissions_paid,
            cash_received: totals.cash_received,
            sales_count: sales.len() as i64,
            roi_pct,
            day: closed,
        })
    }

    /// Record the asset and price an open day sells at.
    ///
    /// The price is checked against the position's average cost and the
    /// configured commission; an unprofitable price is accepted but logged.
    pub async fn set_published_price(
        &self,
        day_id: DayId,
        asset: &AssetSymbol,
        price: Decimal,
    ) -> Result<PricedDay, LedgerError> {
        if !price.is_positive() {
            return Err(LedgerError::invalid("published price must be positive"));
        }

        let mut tx = self.repo.begin_write().await?;
        let day = tx.day(day_id).await?.ok_or(LedgerError::DayNotFound(day_id))?;
        if !day.is_open() {
            return Err(LedgerError::DayNotOpen(day_id));
        }
        require_asset(&mut tx, asset).await?;
        let position = tx
            .position(day.cycle_id, asset)
            .await?
            .ok_or_else(|| LedgerError::AssetNotFound {
                asset: asset.clone(),
                cycle_id: Some(day.cycle_id),
            })?;

        let config = tx.config().await?;
        let quote = price_quote(
            position.average_cost,
            config.default_target_profit_pct,
            config.default_commission_pct,
        )
        .ok_or_else(|| {
            LedgerError::out_of_range(format!("quote for average cost {}", position.average_cost))
        })?;
        let assessment = assess_price(
            position.average_cost,
            price,
            config.default_commission_pct,
            MIN_MARGIN_PCT,
        )
        .ok_or_else(|| {
            LedgerError::out_of_range(format!(
                "margin of price {} over average cost {}",
                price, position.average_cost
            ))
        })?;

        tx.set_day_price(day_id, asset, price).await?;
        let priced = tx.day(day_id).await?.ok_or(LedgerError::DayNotFound(day_id))?;
        tx.commit().await?;

        if !assessment.is_profitable() {
            warn!(
                day_id = %day_id,
                asset = %asset,
                price = %price,
                average_cost = %position.average_cost,
                assessment = ?assessment,
                "Published price is below the minimum margin"
            );
        }
        info!(day_id = %day_id, asset = %asset, price = %price, "Published price set");

        Ok(PricedDay {
            day: priced,
            quote,
            assessment,
        })
    }

    /// Buy a closed day's cash back into its cycle's vault.
    ///
    /// The reinvested cash is profit already counted by the cycle, so the
    /// cycle's initial investment stays as it is.
    ///
    /// # Errors
    /// - `InvalidParameter` if the day is still open, has no cash, or was reinvested
    /// - `NoActiveCycle` if the day's cycle has been closed
    pub async fn reinvest_cash(
        &self,
        day_id: DayId,
        asset: &AssetSymbol,
        unit_price: Decimal,
    ) -> Result<ReinvestReceipt, LedgerError> {
        if !unit_price.is_positive() {
            return Err(LedgerError::invalid("unit price must be positive"));
        }

        let mut tx = self.repo.begin_write().await?;
        let day = tx.day(day_id).await?.ok_or(LedgerError::DayNotFound(day_id))?;
        if day.is_open() {
            return Err(LedgerError::invalid(format!(
                "day {} must be closed before its cash is reinvested",
                day_id
            )));
        }
        if day.cash_reinvested {
            return Err(LedgerError::invalid(format!(
                "day {} was already reinvested",
                day_id
            )));
        }
        if !day.cash_received.is_positive() {
            return Err(LedgerError::invalid(format!(
                "day {} has no cash to reinvest",
                day_id
            )));
        }

        let cycle = resolve_cycle(&mut tx, CycleSelector::Id(day.cycle_id)).await?;
        if !cycle.is_active() {
            return Err(LedgerError::NoActiveCycle(Some(cycle.id)));
        }
        require_asset(&mut tx, asset).await?;

        let deposit = deposit_in_tx(
            &mut tx,
            &cycle,
            asset,
            day.cash_received,
            unit_price,
            PurchaseKind::Reinvest,
            InvestmentPolicy::Keep,
        )
        .await?;
        tx.mark_day_reinvested(day_id).await?;
        let day = tx.day(day_id).await?.ok_or(LedgerError::DayNotFound(day_id))?;
        tx.commit().await?;

        info!(
            cycle_id = %cycle.id,
            day_id = %day_id,
            asset = %asset,
            cash = %day.cash_received,
            quantity = %deposit.quantity_acquired,
            "Day cash reinvested"
        );
        Ok(ReinvestReceipt { day, deposit })
    }

    pub async fn get(&self, day_id: DayId) -> Result<Day, LedgerError> {
        self.repo
            .day(day_id)
            .await?
            .ok_or(LedgerError::DayNotFound(day_id))
    }

    pub async fn open_day_of(&self, cycle: CycleSelector) -> Result<Option<Day>, LedgerError> {
        let cycle = load_cycle(&self.repo, cycle).await?;
        Ok(self.repo.open_day_of(cycle.id).await?)
    }

    pub async fn days_of(&self, cycle: CycleSelector) -> Result<Vec<Day>, LedgerError> {
        let cycle = load_cycle(&self.repo, cycle).await?;
        Ok(self.repo.days_of(cycle.id).await?)
    }

    pub async fn sales_of(&self, day_id: DayId) -> Result<Vec<Sale>, LedgerError> {
        self.get(day_id).await?;
        Ok(self.repo.sales_of(day_id).await?)
    }
}

/// Sum a day's sales into its totals, `None` on overflow.
pub(crate) fn totals_of(sales: &[Sale]) -> Option<DayTotals> {
    sales.iter().try_fold(DayTotals::default(), |acc, sale| {
        acc.checked_add(&DayTotals {
            commissions_paid: sale.commission,
            gross_profit: sale.gross_profit,
            net_profit: sale.net_profit,
            cash_received: sale.net_cash,
        })
    })
}
