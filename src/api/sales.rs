use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::views::{parse_cycle_ref, DayView, PositionView, QuoteView, SaleView};
use crate::api::AppState;
use crate::domain::{AssetSymbol, CycleSelector, DayId, Decimal};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSaleRequest {
    /// Defaults to the open day of the active cycle.
    pub day_id: Option<i64>,
    pub asset: Option<AssetSymbol>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSaleResponse {
    pub sale: SaleView,
    pub day: DayView,
    pub position: PositionView,
    pub sales_count: i64,
    pub max_sales_per_day: i64,
    pub limit_reached: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub cycle_id: Option<String>,
    pub asset: String,
}

pub async fn register_sale(
    State(state): State<AppState>,
    Json(req): Json<RegisterSaleRequest>,
) -> Result<(StatusCode, Json<RegisterSaleResponse>), AppError> {
    let day_id = match req.day_id {
        Some(id) => DayId::new(id),
        None => state
            .ledger
            .days()
            .open_day_of(CycleSelector::Active)
            .await?
            .map(|day| day.id)
            .ok_or_else(|| AppError::Conflict("active cycle has no open day".into()))?,
    };

    let receipt = state
        .ledger
        .sales()
        .register_sale(day_id, req.asset.as_ref(), req.quantity, req.unit_price)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterSaleResponse {
            sale: SaleView::from(&receipt.sale),
            day: DayView::from(&receipt.day),
            position: PositionView::from(&receipt.position),
            sales_count: receipt.sales_count,
            max_sales_per_day: receipt.max_sales_per_day,
            limit_reached: receipt.limit_reached,
        }),
    ))
}

pub async fn get_quote(
    Query(params): Query<QuoteQuery>,
    State(state): State<AppState>,
) -> Result<Json<QuoteView>, AppError> {
    let cycle = match params.cycle_id.as_deref() {
        Some(raw) => parse_cycle_ref(raw)?,
        None => CycleSelector::Active,
    };
    let quote = state
        .ledger
        .quote(cycle, &AssetSymbol::new(&params.asset))
        .await?;
    Ok(Json(QuoteView::from(&quote)))
}
