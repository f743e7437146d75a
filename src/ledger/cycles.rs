//! Cycle lifecycle: open, extend and close accounting periods.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::is_unique_violation;
use super::vault::value_in_tx;
use super::{load_cycle, resolve_cycle, LedgerError};
use crate::db::{NewCycle, Repository};
use crate::domain::{Cycle, CycleId, CycleSelector, Decimal, DayStatus, TimeMs};
use crate::engine::{daily_roi_average, roi};

/// Longest cycle that can be planned, in days.
pub const MAX_PLANNED_DAYS: i64 = 365;

/// Conditions the caller is expected to surface to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleWarning {
    /// The cycle opened with zero initial investment.
    NoSeedCapital,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleCreated {
    pub cycle: Cycle,
    /// Closed cycle whose residual vault value seeded the investment.
    pub seeded_from: Option<CycleId>,
    pub warning: Option<CycleWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleCloseSummary {
    pub cycle: Cycle,
    /// Inventory value left in the cycle's vault at closing.
    pub residual_vault_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPerformance {
    pub day_number: i64,
    pub net_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStats {
    pub cycle_id: CycleId,
    pub total_sales: i64,
    pub closed_days: i64,
    pub total_profit: Decimal,
    pub average_daily_profit: Decimal,
    pub best_day: Option<DayPerformance>,
    pub worst_day: Option<DayPerformance>,
    pub roi_pct: Decimal,
    pub daily_roi_average_pct: Decimal,
    pub days_remaining: i64,
}

/// Opens, extends and closes cycles. At most one cycle is active at a time.
#[derive(Clone)]
pub struct CycleLifecycle {
    repo: Arc<Repository>,
}

impl CycleLifecycle {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Open a new active cycle.
    ///
    /// Without an explicit investment the cycle is seeded with the residual
    /// vault value of the most recently closed cycle. A zero seed is allowed
    /// but reported through `CycleWarning::NoSeedCapital`.
    ///
    /// # Errors
    /// - `ActiveCycleExists` if another cycle is active
    /// - `InvalidParameter` for `planned_days` outside 1..=365 or a negative investment
    pub async fn create(
        &self,
        planned_days: i64,
        initial_investment: Option<Decimal>,
    ) -> Result<CycleCreated, LedgerError> {
        if !(1..=MAX_PLANNED_DAYS).contains(&planned_days) {
            return Err(LedgerError::invalid(format!(
                "planned days must be between 1 and {}, got {}",
                MAX_PLANNED_DAYS, planned_days
            )));
        }
        if let Some(amount) = initial_investment {
            if amount.is_negative() {
                return Err(LedgerError::invalid("initial investment cannot be negative"));
            }
        }

        let mut tx = self.repo.begin_write().await?;
        if let Some(active) = tx.active_cycle().await? {
            return Err(LedgerError::ActiveCycleExists(active.id));
        }

        let (investment, seeded_from) = match initial_investment {
            Some(amount) => (amount, None),
            None => match tx.last_closed_cycle().await? {
                Some(previous) => (value_in_tx(&mut tx, previous.id).await?, Some(previous.id)),
                None => (Decimal::zero(), None),
            },
        };

        let new_cycle = NewCycle {
            start_date: Utc::now().date_naive(),
            planned_days,
            initial_investment: investment,
            created_at: TimeMs::now(),
        };
        let cycle = match tx.insert_cycle(&new_cycle).await {
            Ok(cycle) => cycle,
            Err(e) if is_unique_violation(&e) => {
                return Err(match tx.active_cycle().await? {
                    Some(active) => LedgerError::ActiveCycleExists(active.id),
                    None => LedgerError::Storage(e),
                });
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;

        let warning = investment.is_zero().then_some(CycleWarning::NoSeedCapital);
        if warning.is_some() {
            warn!(cycle_id = %cycle.id, "Cycle opened without seed capital");
        }
        info!(
            cycle_id = %cycle.id,
            planned_days = planned_days,
            initial_investment = %investment,
            seeded_from = ?seeded_from.map(|id| id.as_i64()),
            "Cycle created"
        );

        Ok(CycleCreated {
            cycle,
            seeded_from,
            warning,
        })
    }

    /// Close an active cycle and stamp its final figures from its closed days.
    ///
    /// # Errors
    /// - `NoActiveCycle` if the cycle is already closed
    /// - `OpenDayExists` while one of its days is still open
    pub async fn close(&self, cycle: CycleSelector) -> Result<CycleCloseSummary, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        let cycle = resolve_cycle(&mut tx, cycle).await?;
        if !cycle.is_active() {
            return Err(LedgerError::NoActiveCycle(Some(cycle.id)));
        }
        if let Some(day) = tx.open_day_of(cycle.id).await? {
            return Err(LedgerError::OpenDayExists {
                cycle_id: cycle.id,
                day_id: day.id,
            });
        }

        let closed_days: Vec<_> = tx
            .days_of(cycle.id)
            .await?
            .into_iter()
            .filter(|d| d.status == DayStatus::Closed)
            .collect();
        let operated_days = closed_days.len() as i64;
        let total_profit = Decimal::checked_sum(closed_days.iter().map(|d| d.net_profit))
            .ok_or_else(|| {
                LedgerError::out_of_range(format!(
                    "profit of {} closed days in cycle {}",
                    operated_days, cycle.id
                ))
            })?;
        let out_of_range = || {
            LedgerError::out_of_range(format!(
                "investment of {} with profit {}",
                cycle.initial_investment, total_profit
            ))
        };
        let final_capital = cycle
            .initial_investment
            .checked_add(total_profit)
            .ok_or_else(out_of_range)?;
        let total_roi_pct = roi(total_profit, cycle.initial_investment).ok_or_else(out_of_range)?;

        tx.mark_cycle_closed(
            cycle.id,
            operated_days,
            total_profit,
            final_capital,
            total_roi_pct,
            TimeMs::now(),
        )
        .await?;
        let residual_vault_value = value_in_tx(&mut tx, cycle.id).await?;
        let closed = tx
            .cycle(cycle.id)
            .await?
            .ok_or(LedgerError::CycleNotFound(cycle.id))?;
        tx.commit().await?;

        info!(
            cycle_id = %closed.id,
            operated_days = operated_days,
            total_profit = %total_profit,
            final_capital = %final_capital,
            roi_pct = %total_roi_pct.round_pct(),
            "Cycle closed"
        );
        Ok(CycleCloseSummary {
            cycle: closed,
            residual_vault_value,
        })
    }

    /// Add `extra_days` to an active cycle's plan.
    pub async fn extend(&self, cycle: CycleSelector, extra_days: i64) -> Result<Cycle, LedgerError> {
        if !(1..=MAX_PLANNED_DAYS).contains(&extra_days) {
            return Err(LedgerError::invalid(format!(
                "extra days must be between 1 and {}, got {}",
                MAX_PLANNED_DAYS, extra_days
            )));
        }

        let mut tx = self.repo.begin_write().await?;
        let cycle = resolve_cycle(&mut tx, cycle).await?;
        if !cycle.is_active() {
            return Err(LedgerError::NoActiveCycle(Some(cycle.id)));
        }

        let planned_days = cycle.planned_days + extra_days;
        tx.set_planned_days(cycle.id, planned_days).await?;
        let extended = tx
            .cycle(cycle.id)
            .await?
            .ok_or(LedgerError::CycleNotFound(cycle.id))?;
        tx.commit().await?;

        info!(
            cycle_id = %extended.id,
            extra_days = extra_days,
            planned_days = planned_days,
            "Cycle extended"
        );
        Ok(extended)
    }

    pub async fn active(&self) -> Result<Option<Cycle>, LedgerError> {
        Ok(self.repo.active_cycle().await?)
    }

    pub async fn get(&self, cycle: CycleSelector) -> Result<Cycle, LedgerError> {
        load_cycle(&self.repo, cycle).await
    }

    /// Most recent cycles first.
    pub async fn history(&self, limit: i64) -> Result<Vec<Cycle>, LedgerError> {
        Ok(self.repo.cycles(limit.max(0)).await?)
    }

    /// Performance figures over a cycle's closed days.
    pub async fn stats(&self, cycle: CycleSelector) -> Result<CycleStats, LedgerError> {
        let cycle = load_cycle(&self.repo, cycle).await?;
        let days = self.repo.days_of(cycle.id).await?;
        let total_sales = self.repo.count_sales_of_cycle(cycle.id).await?;

        let closed: Vec<DayPerformance> = days
            .iter()
            .filter(|d| d.status == DayStatus::Closed)
            .map(|d| DayPerformance {
                day_number: d.day_number,
                net_profit: d.net_profit,
            })
            .collect();
        let closed_days = closed.len() as i64;
        let total_profit = Decimal::checked_sum(closed.iter().map(|d| d.net_profit))
            .ok_or_else(|| {
                LedgerError::out_of_range(format!(
                    "profit of {} closed days in cycle {}",
                    closed_days, cycle.id
                ))
            })?;
        let average_daily_profit = total_profit
            .checked_div(Decimal::from_i64(closed_days))
            .unwrap_or_default();

        // Earliest day wins ties.
        let best_day = closed.iter().copied().reduce(|best, d| {
            if d.net_profit > best.net_profit {
                d
            } else {
                best
            }
        });
        let worst_day = closed.iter().copied().reduce(|worst, d| {
            if d.net_profit < worst.net_profit {
                d
            } else {
                worst
            }
        });

        let roi_pct = roi(total_profit, cycle.initial_investment).ok_or_else(|| {
            LedgerError::out_of_range(format!(
                "return of {} on investment {}",
                total_profit, cycle.initial_investment
            ))
        })?;
        Ok(CycleStats {
            cycle_id: cycle.id,
            total_sales,
            closed_days,
            total_profit,
            average_daily_profit,
            best_day,
            worst_day,
            roi_pct,
            daily_roi_average_pct: daily_roi_average(roi_pct, closed_days),
            days_remaining: cycle.days_remaining(),
        })
    }
}
