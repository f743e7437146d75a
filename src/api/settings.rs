use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::views::pct;
use crate::api::AppState;
use crate::domain::{Decimal, LedgerConfig};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub default_commission_pct: String,
    pub default_target_profit_pct: String,
    pub min_sales_per_day: i64,
    pub max_sales_per_day: i64,
}

impl From<&LedgerConfig> for ConfigResponse {
    fn from(c: &LedgerConfig) -> Self {
        ConfigResponse {
            default_commission_pct: pct(c.default_commission_pct),
            default_target_profit_pct: pct(c.default_target_profit_pct),
            min_sales_per_day: c.min_sales_per_day,
            max_sales_per_day: c.max_sales_per_day,
        }
    }
}

/// Partial update; omitted fields keep their stored value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigRequest {
    pub default_commission_pct: Option<Decimal>,
    pub default_target_profit_pct: Option<Decimal>,
    pub min_sales_per_day: Option<i64>,
    pub max_sales_per_day: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AssetDto {
    pub symbol: String,
    pub name: String,
    pub kind: String,
}

pub async fn get_config(State(state): State<AppState>) -> Result<Json<ConfigResponse>, AppError> {
    let config = state.ledger.config().await?;
    Ok(Json(ConfigResponse::from(&config)))
}

pub async fn update_config(
    State(state): State<AppState>,
    Json(req): Json<UpdateConfigRequest>,
) -> Result<Json<ConfigResponse>, AppError> {
    let current = state.ledger.config().await?;
    let updated = LedgerConfig {
        default_commission_pct: req
            .default_commission_pct
            .unwrap_or(current.default_commission_pct),
        default_target_profit_pct: req
            .default_target_profit_pct
            .unwrap_or(current.default_target_profit_pct),
        min_sales_per_day: req.min_sales_per_day.unwrap_or(current.min_sales_per_day),
        max_sales_per_day: req.max_sales_per_day.unwrap_or(current.max_sales_per_day),
    };
    let stored = state.ledger.update_config(updated).await?;
    Ok(Json(ConfigResponse::from(&stored)))
}

pub async fn get_assets(State(state): State<AppState>) -> Result<Json<Vec<AssetDto>>, AppError> {
    let assets = state.ledger.assets().await?;
    Ok(Json(
        assets
            .into_iter()
            .map(|a| AssetDto {
                symbol: a.symbol.to_string(),
                name: a.name,
                kind: a.kind.as_str().to_string(),
            })
            .collect(),
    ))
}
