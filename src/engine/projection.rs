//! Cycle projections: what a fixed daily return does to a capital over time.
//!
//! A projection runs day by day at full `Decimal` precision. Without
//! compounding every day earns on the starting capital; with compounding
//! each day's profit is added to the capital the next day earns on.

use thiserror::Error;

use crate::domain::Decimal;

/// Longest horizon any projection or target search will walk.
pub const MAX_PROJECTION_DAYS: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("capital must be positive, got {0}")]
    NonPositiveCapital(Decimal),

    #[error("days must be between 1 and {max}, got {days}")]
    DaysOutOfRange { days: i64, max: i64 },

    #[error("target must be positive, got {0}")]
    NonPositiveTarget(Decimal),

    #[error("a profit of {target} is not reached within {max_days} days")]
    Unreachable { target: Decimal, max_days: i64 },

    #[error("minimum daily return {min}% is above the maximum {max}%")]
    InvertedRange { min: Decimal, max: Decimal },

    #[error("projection exceeds the supported decimal range")]
    OutOfRange,
}

/// One simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedDay {
    pub day: i64,
    /// Capital the day's return is earned on.
    pub working_capital: Decimal,
    pub profit: Decimal,
    pub cumulative_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleProjection {
    pub initial_capital: Decimal,
    pub days: i64,
    pub daily_pct: Decimal,
    pub compounding: bool,
    pub total_profit: Decimal,
    pub final_capital: Decimal,
    pub roi_pct: Decimal,
    pub daily_roi_average_pct: Decimal,
    pub history: Vec<ProjectedDay>,
}

/// Days needed before the cumulative profit reaches a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetProjection {
    pub target_usd: Decimal,
    pub days_needed: i64,
    pub daily_pct: Decimal,
    pub compounding: bool,
    pub initial_capital: Decimal,
    pub total_profit: Decimal,
    pub final_capital: Decimal,
}

/// The same cycle run with and without compounding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyComparison {
    pub simple: CycleProjection,
    pub compound: CycleProjection,
    pub difference_usd: Decimal,
    /// Extra profit from compounding relative to the simple profit, in percent.
    pub compound_advantage_pct: Decimal,
}

/// Pessimistic, average and optimistic runs over a range of daily returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioProjection {
    pub pessimistic: CycleProjection,
    pub average: CycleProjection,
    pub optimistic: CycleProjection,
}

fn checked(value: Option<Decimal>) -> Result<Decimal, ProjectionError> {
    value.ok_or(ProjectionError::OutOfRange)
}

fn require_capital(capital: Decimal) -> Result<(), ProjectionError> {
    if capital.is_positive() {
        Ok(())
    } else {
        Err(ProjectionError::NonPositiveCapital(capital))
    }
}

fn require_days(days: i64) -> Result<(), ProjectionError> {
    if (1..=MAX_PROJECTION_DAYS).contains(&days) {
        Ok(())
    } else {
        Err(ProjectionError::DaysOutOfRange {
            days,
            max: MAX_PROJECTION_DAYS,
        })
    }
}

/// Walks the days one at a time, yielding each day's simulated result.
struct Simulation {
    initial_capital: Decimal,
    capital: Decimal,
    rate: Decimal,
    compounding: bool,
    day: i64,
    cumulative_profit: Decimal,
}

impl Simulation {
    fn new(capital: Decimal, daily_pct: Decimal, compounding: bool) -> Self {
        Self {
            initial_capital: capital,
            capital,
            rate: daily_pct / Decimal::hundred(),
            compounding,
            day: 0,
            cumulative_profit: Decimal::zero(),
        }
    }

    fn step(&mut self) -> Result<ProjectedDay, ProjectionError> {
        let working_capital = self.capital;
        let profit = checked(working_capital.checked_mul(self.rate))?;
        self.cumulative_profit = checked(self.cumulative_profit.checked_add(profit))?;
        if self.compounding {
            self.capital = checked(self.capital.checked_add(profit))?;
        }
        self.day += 1;
        Ok(ProjectedDay {
            day: self.day,
            working_capital,
            profit,
            cumulative_profit: self.cumulative_profit,
        })
    }

    fn final_capital(&self) -> Result<Decimal, ProjectionError> {
        checked(self.initial_capital.checked_add(self.cumulative_profit))
    }
}

/// Project `days` days earning `daily_pct` percent a day on `capital`.
pub fn project_cycle(
    capital: Decimal,
    days: i64,
    daily_pct: Decimal,
    compounding: bool,
) -> Result<CycleProjection, ProjectionError> {
    require_capital(capital)?;
    require_days(days)?;

    let mut sim = Simulation::new(capital, daily_pct, compounding);
    let history = (0..days)
        .map(|_| sim.step())
        .collect::<Result<Vec<_>, _>>()?;

    let total_profit = sim.cumulative_profit;
    let roi_pct = checked(
        total_profit
            .checked_div(capital)
            .and_then(|r| r.checked_mul(Decimal::hundred())),
    )?;
    Ok(CycleProjection {
        initial_capital: capital,
        days,
        daily_pct,
        compounding,
        total_profit,
        final_capital: sim.final_capital()?,
        roi_pct,
        daily_roi_average_pct: roi_pct / Decimal::from_i64(days),
        history,
    })
}

/// Smallest number of days whose cumulative profit reaches `target_usd`.
///
/// # Errors
/// `Unreachable` when a non-positive return or the day limit stops the search.
pub fn days_to_target(
    capital: Decimal,
    target_usd: Decimal,
    daily_pct: Decimal,
    compounding: bool,
) -> Result<TargetProjection, ProjectionError> {
    require_capital(capital)?;
    if !target_usd.is_positive() {
        return Err(ProjectionError::NonPositiveTarget(target_usd));
    }
    let unreachable = ProjectionError::Unreachable {
        target: target_usd,
        max_days: MAX_PROJECTION_DAYS,
    };
    if !daily_pct.is_positive() {
        return Err(unreachable);
    }

    let mut sim = Simulation::new(capital, daily_pct, compounding);
    while sim.cumulative_profit < target_usd {
        if sim.day >= MAX_PROJECTION_DAYS {
            return Err(unreachable);
        }
        sim.step()?;
    }

    Ok(TargetProjection {
        target_usd,
        days_needed: sim.day,
        daily_pct,
        compounding,
        initial_capital: capital,
        total_profit: sim.cumulative_profit,
        final_capital: sim.final_capital()?,
    })
}

pub fn compare_strategies(
    capital: Decimal,
    days: i64,
    daily_pct: Decimal,
) -> Result<StrategyComparison, ProjectionError> {
    let simple = project_cycle(capital, days, daily_pct, false)?;
    let compound = project_cycle(capital, days, daily_pct, true)?;

    let difference_usd = checked(compound.total_profit.checked_sub(simple.total_profit))?;
    let compound_advantage_pct = if simple.total_profit.is_zero() {
        Decimal::zero()
    } else {
        checked(
            difference_usd
                .checked_div(simple.total_profit)
                .and_then(|r| r.checked_mul(Decimal::hundred())),
        )?
    };

    Ok(StrategyComparison {
        simple,
        compound,
        difference_usd,
        compound_advantage_pct,
    })
}

/// Run the cycle at `min_pct`, at the midpoint and at `max_pct`.
pub fn project_scenarios(
    capital: Decimal,
    days: i64,
    min_pct: Decimal,
    max_pct: Decimal,
    compounding: bool,
) -> Result<ScenarioProjection, ProjectionError> {
    if min_pct > max_pct {
        return Err(ProjectionError::InvertedRange {
            min: min_pct,
            max: max_pct,
        });
    }
    let average_pct = checked(min_pct.checked_add(max_pct))? / Decimal::from_i64(2);

    Ok(ScenarioProjection {
        pessimistic: project_cycle(capital, days, min_pct, compounding)?,
        average: project_cycle(capital, days, average_pct, compounding)?,
        optimistic: project_cycle(capital, days, max_pct, compounding)?,
    })
}
