use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::views::{
    pct, qty, usd, AssessmentView, DayView, PositionView, QuoteView, SaleView,
};
use crate::api::AppState;
use crate::domain::{AssetSymbol, CycleSelector, DayId, Decimal};
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDayRequest {
    #[serde(default)]
    pub cycle_id: CycleSelector,
    pub asset: Option<AssetSymbol>,
    pub published_price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDetailResponse {
    pub day: DayView,
    pub sales: Vec<SaleView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseDayResponse {
    pub day: DayView,
    pub final_capital: String,
    pub net_profit: String,
    pub gross_profit: String,
    pub commissions_paid: String,
    pub cash_received: String,
    pub sales_count: i64,
    pub roi_pct: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPriceRequest {
    pub asset: AssetSymbol,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPriceResponse {
    pub day: DayView,
    pub quote: QuoteView,
    pub assessment: AssessmentView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinvestRequest {
    pub asset: AssetSymbol,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinvestResponse {
    pub day: DayView,
    pub quantity_acquired: String,
    pub position: PositionView,
}

pub async fn open_day(
    State(state): State<AppState>,
    body: Option<Json<OpenDayRequest>>,
) -> Result<(StatusCode, Json<DayView>), AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let day = state
        .ledger
        .days()
        .open_day(req.cycle_id, req.asset.as_ref(), req.published_price)
        .await?;
    Ok((StatusCode::CREATED, Json(DayView::from(&day))))
}

pub async fn get_day(
    Path(day_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<DayDetailResponse>, AppError> {
    let days = state.ledger.days();
    let day = days.get(DayId::new(day_id)).await?;
    let sales = days.sales_of(day.id).await?;
    Ok(Json(DayDetailResponse {
        day: DayView::from(&day),
        sales: sales.iter().map(SaleView::from).collect(),
    }))
}

pub async fn close_day(
    Path(day_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CloseDayResponse>, AppError> {
    let summary = state.ledger.days().close_day(DayId::new(day_id)).await?;
    Ok(Json(CloseDayResponse {
        day: DayView::from(&summary.day),
        final_capital: usd(summary.final_capital),
        net_profit: usd(summary.net_profit),
        gross_profit: usd(summary.gross_profit),
        commissions_paid: usd(summary.commissions_paid),
        cash_received: usd(summary.cash_received),
        sales_count: summary.sales_count,
        roi_pct: pct(summary.roi_pct),
    }))
}

pub async fn set_price(
    Path(day_id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<SetPriceRequest>,
) -> Result<Json<SetPriceResponse>, AppError> {
    let priced = state
        .ledger
        .days()
        .set_published_price(DayId::new(day_id), &req.asset, req.price)
        .await?;
    Ok(Json(SetPriceResponse {
        day: DayView::from(&priced.day),
        quote: QuoteView::from(&priced.quote),
        assessment: AssessmentView::from(&priced.assessment),
    }))
}

pub async fn reinvest(
    Path(day_id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<ReinvestRequest>,
) -> Result<Json<ReinvestResponse>, AppError> {
    let receipt = state
        .ledger
        .days()
        .reinvest_cash(DayId::new(day_id), &req.asset, req.unit_price)
        .await?;
    Ok(Json(ReinvestResponse {
        day: DayView::from(&receipt.day),
        quantity_acquired: qty(receipt.deposit.quantity_acquired),
        position: PositionView::from(&receipt.deposit.position),
    }))
}
