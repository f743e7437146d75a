use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::views::{parse_cycle_ref, pct, usd};
use crate::api::AppState;
use crate::domain::{CycleSelector, Decimal};
use crate::engine::{
    compare_strategies, days_to_target, project_cycle, project_scenarios, CycleProjection,
    ProjectedDay, TargetProjection,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionQuery {
    /// Defaults to the vault value of `cycle_id` (or the active cycle).
    pub capital: Option<String>,
    pub cycle_id: Option<String>,
    pub days: Option<i64>,
    /// Defaults to the configured target profit.
    pub daily_pct: Option<String>,
    #[serde(default)]
    pub compound: bool,
    pub target_usd: Option<String>,
    pub min_pct: Option<String>,
    pub max_pct: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedDayView {
    pub day: i64,
    pub working_capital: String,
    pub profit: String,
    pub cumulative_profit: String,
}

impl From<&ProjectedDay> for ProjectedDayView {
    fn from(d: &ProjectedDay) -> Self {
        ProjectedDayView {
            day: d.day,
            working_capital: usd(d.working_capital),
            profit: usd(d.profit),
            cumulative_profit: usd(d.cumulative_profit),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleProjectionView {
    pub initial_capital: String,
    pub days: i64,
    pub daily_pct: String,
    pub compounding: bool,
    pub total_profit: String,
    pub final_capital: String,
    pub roi_pct: String,
    pub daily_roi_average_pct: String,
    pub history: Vec<ProjectedDayView>,
}

impl From<&CycleProjection> for CycleProjectionView {
    fn from(p: &CycleProjection) -> Self {
        CycleProjectionView {
            initial_capital: usd(p.initial_capital),
            days: p.days,
            daily_pct: pct(p.daily_pct),
            compounding: p.compounding,
            total_profit: usd(p.total_profit),
            final_capital: usd(p.final_capital),
            roi_pct: pct(p.roi_pct),
            daily_roi_average_pct: pct(p.daily_roi_average_pct),
            history: p.history.iter().map(ProjectedDayView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonView {
    pub simple_profit: String,
    pub simple_final_capital: String,
    pub compound_profit: String,
    pub compound_final_capital: String,
    pub difference_usd: String,
    pub compound_advantage_pct: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetView {
    pub target_usd: String,
    pub days_needed: i64,
    pub total_profit: String,
    pub final_capital: String,
}

impl From<&TargetProjection> for TargetView {
    fn from(t: &TargetProjection) -> Self {
        TargetView {
            target_usd: usd(t.target_usd),
            days_needed: t.days_needed,
            total_profit: usd(t.total_profit),
            final_capital: usd(t.final_capital),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenariosView {
    pub pessimistic: CycleProjectionView,
    pub average: CycleProjectionView,
    pub optimistic: CycleProjectionView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResponse {
    pub projection: CycleProjectionView,
    pub comparison: ComparisonView,
    pub target: Option<TargetView>,
    pub scenarios: Option<ScenariosView>,
}

fn parse_decimal(name: &str, raw: Option<&str>) -> Result<Option<Decimal>, AppError> {
    raw.map(|s| {
        Decimal::from_str(s.trim())
            .map_err(|_| AppError::BadRequest(format!("invalid {}: {}", name, s)))
    })
    .transpose()
}

pub async fn get_projection(
    Query(params): Query<ProjectionQuery>,
    State(state): State<AppState>,
) -> Result<Json<ProjectionResponse>, AppError> {
    let capital = match parse_decimal("capital", params.capital.as_deref())? {
        Some(capital) => capital,
        None => {
            let selector = match params.cycle_id.as_deref() {
                Some(raw) => parse_cycle_ref(raw)?,
                None => CycleSelector::Active,
            };
            let cycle = state.ledger.cycles().get(selector).await?;
            state.ledger.vault().value_of(cycle.id).await?
        }
    };
    let days = params.days.unwrap_or(state.config.default_cycle_days);
    let daily_pct = match parse_decimal("dailyPct", params.daily_pct.as_deref())? {
        Some(daily_pct) => daily_pct,
        None => state.ledger.config().await?.default_target_profit_pct,
    };

    let projection = project_cycle(capital, days, daily_pct, params.compound)?;
    let comparison = compare_strategies(capital, days, daily_pct)?;
    let target = match parse_decimal("targetUsd", params.target_usd.as_deref())? {
        Some(target_usd) => Some(days_to_target(
            capital,
            target_usd,
            daily_pct,
            params.compound,
        )?),
        None => None,
    };
    let min_pct = parse_decimal("minPct", params.min_pct.as_deref())?;
    let max_pct = parse_decimal("maxPct", params.max_pct.as_deref())?;
    let scenarios = match (min_pct, max_pct) {
        (Some(min), Some(max)) => Some(project_scenarios(
            capital,
            days,
            min,
            max,
            params.compound,
        )?),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "minPct and maxPct must be given together".into(),
            ))
        }
    };

    Ok(Json(ProjectionResponse {
        projection: CycleProjectionView::from(&projection),
        comparison: ComparisonView {
            simple_profit: usd(comparison.simple.total_profit),
            simple_final_capital: usd(comparison.simple.final_capital),
            compound_profit: usd(comparison.compound.total_profit),
            compound_final_capital: usd(comparison.compound.final_capital),
            difference_usd: usd(comparison.difference_usd),
            compound_advantage_pct: pct(comparison.compound_advantage_pct),
        },
        target: target.as_ref().map(TargetView::from),
        scenarios: scenarios.map(|s| ScenariosView {
            pessimistic: CycleProjectionView::from(&s.pessimistic),
            average: CycleProjectionView::from(&s.average),
            optimistic: CycleProjectionView::from(&s.optimistic),
        }),
    }))
}
