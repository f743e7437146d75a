use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::views::{parse_cycle_ref, pct, usd, CycleView, PositionView, PurchaseView};
use crate::api::AppState;
use crate::domain::Decimal;
use crate::error::AppError;
use crate::ledger::{positions_value, CycleWarning, DayPerformance};

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCycleRequest {
    pub planned_days: Option<i64>,
    pub initial_investment: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCycleResponse {
    pub cycle: CycleView,
    pub seeded_from: Option<i64>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseCycleResponse {
    pub cycle: CycleView,
    pub residual_vault_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendCycleRequest {
    pub extra_days: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPerformanceDto {
    pub day_number: i64,
    pub net_profit: String,
}

impl From<DayPerformance> for DayPerformanceDto {
    fn from(d: DayPerformance) -> Self {
        DayPerformanceDto {
            day_number: d.day_number,
            net_profit: usd(d.net_profit),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStatsResponse {
    pub cycle_id: i64,
    pub total_sales: i64,
    pub closed_days: i64,
    pub total_profit: String,
    pub average_daily_profit: String,
    pub best_day: Option<DayPerformanceDto>,
    pub worst_day: Option<DayPerformanceDto>,
    pub roi_pct: String,
    pub daily_roi_average_pct: String,
    pub days_remaining: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleVaultResponse {
    pub cycle_id: i64,
    pub total_value: String,
    pub positions: Vec<PositionView>,
    pub purchases: Vec<PurchaseView>,
}

pub async fn list_cycles(
    Query(params): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CycleView>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let cycles = state.ledger.cycles().history(limit).await?;
    Ok(Json(cycles.iter().map(CycleView::from).collect()))
}

pub async fn create_cycle(
    State(state): State<AppState>,
    body: Option<Json<CreateCycleRequest>>,
) -> Result<(StatusCode, Json<CreateCycleResponse>), AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let planned_days = req.planned_days.unwrap_or(state.config.default_cycle_days);

    let created = state
        .ledger
        .cycles()
        .create(planned_days, req.initial_investment)
        .await?;

    let warnings = created
        .warning
        .iter()
        .map(|w| match w {
            CycleWarning::NoSeedCapital => {
                "cycle opened with zero initial investment; deposit capital before trading"
                    .to_string()
            }
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(CreateCycleResponse {
            cycle: CycleView::from(&created.cycle),
            seeded_from: created.seeded_from.map(|id| id.as_i64()),
            warnings,
        }),
    ))
}

pub async fn get_cycle(
    Path(cycle_ref): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CycleView>, AppError> {
    let selector = parse_cycle_ref(&cycle_ref)?;
    let cycle = state.ledger.cycles().get(selector).await?;
    Ok(Json(CycleView::from(&cycle)))
}

pub async fn close_cycle(
    Path(cycle_ref): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CloseCycleResponse>, AppError> {
    let selector = parse_cycle_ref(&cycle_ref)?;
    let summary = state.ledger.cycles().close(selector).await?;
    Ok(Json(CloseCycleResponse {
        cycle: CycleView::from(&summary.cycle),
        residual_vault_value: usd(summary.residual_vault_value),
    }))
}

pub async fn extend_cycle(
    Path(cycle_ref): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ExtendCycleRequest>,
) -> Result<Json<CycleView>, AppError> {
    let selector = parse_cycle_ref(&cycle_ref)?;
    let cycle = state.ledger.cycles().extend(selector, req.extra_days).await?;
    Ok(Json(CycleView::from(&cycle)))
}

pub async fn get_cycle_stats(
    Path(cycle_ref): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CycleStatsResponse>, AppError> {
    let selector = parse_cycle_ref(&cycle_ref)?;
    let stats = state.ledger.cycles().stats(selector).await?;
    Ok(Json(CycleStatsResponse {
        cycle_id: stats.cycle_id.as_i64(),
        total_sales: stats.total_sales,
        closed_days: stats.closed_days,
        total_profit: usd(stats.total_profit),
        average_daily_profit: usd(stats.average_daily_profit),
        best_day: stats.best_day.map(DayPerformanceDto::from),
        worst_day: stats.worst_day.map(DayPerformanceDto::from),
        roi_pct: pct(stats.roi_pct),
        daily_roi_average_pct: pct(stats.daily_roi_average_pct),
        days_remaining: stats.days_remaining,
    }))
}

pub async fn get_cycle_vault(
    Path(cycle_ref): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CycleVaultResponse>, AppError> {
    let selector = parse_cycle_ref(&cycle_ref)?;
    let cycle = state.ledger.cycles().get(selector).await?;
    let vault = state.ledger.vault();

    let positions = vault.positions(cycle.id).await?;
    let purchases = vault.purchases(cycle.id).await?;
    let total_value = positions_value(&positions)?;

    Ok(Json(CycleVaultResponse {
        cycle_id: cycle.id.as_i64(),
        total_value: usd(total_value),
        positions: positions.iter().map(PositionView::from).collect(),
        purchases: purchases.iter().map(PurchaseView::from).collect(),
    }))
}
