use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::views::{price, qty, usd, PositionView, PurchaseView};
use crate::api::AppState;
use crate::domain::{AssetSymbol, CycleSelector, Decimal, QuantitySpec};
use crate::error::AppError;
use crate::ledger::InvestmentPolicy;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    #[serde(default)]
    pub cycle_id: CycleSelector,
    pub asset: AssetSymbol,
    pub usd_amount: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub policy: InvestmentPolicy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub quantity_acquired: String,
    pub new_average_cost: String,
    pub initial_investment: String,
    pub position: PositionView,
    pub purchase: PurchaseView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    #[serde(default)]
    pub cycle_id: CycleSelector,
    pub asset: AssetSymbol,
    pub quantity: QuantitySpec,
    #[serde(default)]
    pub policy: InvestmentPolicy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    pub quantity_withdrawn: String,
    pub usd_value: String,
    pub initial_investment: String,
    pub position: PositionView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_cycle_id: CycleSelector,
    #[serde(default)]
    pub to_cycle_id: CycleSelector,
    pub asset: AssetSymbol,
    pub quantity: QuantitySpec,
    #[serde(default)]
    pub policy: InvestmentPolicy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub quantity: String,
    pub average_cost: String,
    pub usd_value: String,
    pub source: PositionView,
    pub destination: PositionView,
}

pub async fn deposit(
    State(state): State<AppState>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, AppError> {
    let receipt = state
        .ledger
        .vault()
        .deposit(req.cycle_id, &req.asset, req.usd_amount, req.unit_price, req.policy)
        .await?;

    Ok(Json(DepositResponse {
        quantity_acquired: qty(receipt.quantity_acquired),
        new_average_cost: price(receipt.new_average_cost),
        initial_investment: usd(receipt.initial_investment),
        position: PositionView::from(&receipt.position),
        purchase: PurchaseView::from(&receipt.purchase),
    }))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>, AppError> {
    let receipt = state
        .ledger
        .vault()
        .withdraw(req.cycle_id, &req.asset, req.quantity, req.policy)
        .await?;

    Ok(Json(WithdrawResponse {
        quantity_withdrawn: qty(receipt.quantity_withdrawn),
        usd_value: usd(receipt.usd_value),
        initial_investment: usd(receipt.initial_investment),
        position: PositionView::from(&receipt.position),
    }))
}

pub async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, AppError> {
    let receipt = state
        .ledger
        .vault()
        .transfer(
            req.from_cycle_id,
            req.to_cycle_id,
            &req.asset,
            req.quantity,
            req.policy,
        )
        .await?;

    Ok(Json(TransferResponse {
        quantity: qty(receipt.quantity),
        average_cost: price(receipt.average_cost),
        usd_value: usd(receipt.usd_value),
        source: PositionView::from(&receipt.source),
        destination: PositionView::from(&receipt.destination),
    }))
}
