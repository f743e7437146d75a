//! Sale processor: atomic sale registration against an open day.

use std::sync::Arc;
use tracing::{info, warn};

use super::vault::{remove_inventory, require_asset};
use super::LedgerError;
use crate::db::{DayTotals, NewSale, Repository};
use crate::domain::{AssetSymbol, Day, DayId, Decimal, QuantitySpec, Sale, TimeMs, VaultPosition};
use crate::engine::sale_breakdown;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleReceipt {
    pub sale: Sale,
    /// The day with its running totals after this sale.
    pub day: Day,
    pub position: VaultPosition,
    pub sales_count: i64,
    pub max_sales_per_day: i64,
    /// The configured daily maximum has been reached. Further sales are
    /// still accepted.
    pub limit_reached: bool,
}

/// Registers sales. Each sale is all-or-nothing.
#[derive(Clone)]
pub struct SaleProcessor {
    repo: Arc<Repository>,
}

impl SaleProcessor {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Sell `quantity` of the day's asset (or `asset`) at `unit_price`.
    ///
    /// The sale row, the vault withdrawal and the day's running totals are
    /// written in one transaction; on any failure none of them change.
    ///
    /// # Errors
    /// - `DayNotOpen` if the day is closed
    /// - `AssetNotFound` if the cycle holds no position in the asset
    /// - `InsufficientInventory` if `quantity` exceeds the holding
    /// - `InvalidParameter` for a non-positive quantity or price, or no asset
    pub async fn register_sale(
        &self,
        day_id: DayId,
        asset: Option<&AssetSymbol>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Result<SaleReceipt, LedgerError> {
        if !quantity.is_positive() {
            return Err(LedgerError::invalid("sale quantity must be positive"));
        }
        if !unit_price.is_positive() {
            return Err(LedgerError::invalid("sale price must be positive"));
        }

        let mut tx = self.repo.begin_write().await?;
        let day = tx.day(day_id).await?.ok_or(LedgerError::DayNotFound(day_id))?;
        if !day.is_open() {
            return Err(LedgerError::DayNotOpen(day_id));
        }

        let asset = match asset.or(day.asset.as_ref()) {
            Some(asset) => asset.clone(),
            None => {
                return Err(LedgerError::invalid(format!(
                    "day {} has no asset set; pass the asset being sold",
                    day_id
                )))
            }
        };
        require_asset(&mut tx, &asset).await?;

        let config = tx.config().await?;
        let held = tx
            .position(day.cycle_id, &asset)
            .await?
            .ok_or_else(|| LedgerError::AssetNotFound {
                asset: asset.clone(),
                cycle_id: Some(day.cycle_id),
            })?;
        let breakdown = sale_breakdown(
            quantity,
            held.average_cost,
            unit_price,
            config.default_commission_pct,
        )
        .ok_or_else(|| {
            LedgerError::out_of_range(format!(
                "sale of {} {} at {} (average cost {})",
                quantity, asset, unit_price, held.average_cost
            ))
        })?;
        let recorded = DayTotals {
            commissions_paid: day.commissions_paid,
            gross_profit: day.gross_profit,
            net_profit: day.net_profit,
            cash_received: day.cash_received,
        };
        let totals = recorded
            .checked_add(&DayTotals {
                commissions_paid: breakdown.commission,
                gross_profit: breakdown.gross_profit,
                net_profit: breakdown.net_profit,
                cash_received: breakdown.net_cash,
            })
            .ok_or_else(|| {
                LedgerError::out_of_range(format!(
                    "day {} totals after a sale netting {}",
                    day_id, breakdown.net_cash
                ))
            })?;

        let (position, _) =
            remove_inventory(&mut tx, day.cycle_id, &asset, QuantitySpec::Exact(quantity)).await?;

        let sale = tx
            .insert_sale(&NewSale {
                day_id,
                asset: asset.clone(),
                quantity,
                unit_price,
                cost_basis_total: breakdown.cost_total,
                gross_amount: breakdown.gross_amount,
                commission: breakdown.commission,
                net_cash: breakdown.net_cash,
                gross_profit: breakdown.gross_profit,
                net_profit: breakdown.net_profit,
                timestamp: TimeMs::now(),
            })
            .await?;

        tx.set_day_totals(day_id, &totals).await?;
        let sales_count = tx.count_sales_of_day(day_id).await?;
        let day = tx.day(day_id).await?.ok_or(LedgerError::DayNotFound(day_id))?;
        tx.commit().await?;

        let limit_reached = sales_count >= config.max_sales_per_day;
        info!(
            day_id = %day_id,
            sale_id = sale.id,
            asset = %asset,
            quantity = %quantity,
            unit_price = %unit_price,
            net_profit = %breakdown.net_profit,
            sales_count = sales_count,
            "Sale registered"
        );
        if limit_reached {
            warn!(
                day_id = %day_id,
                sales_count = sales_count,
                max_sales_per_day = config.max_sales_per_day,
                "Daily sales limit reached"
            );
        }

        Ok(SaleReceipt {
            sale,
            day,
            position,
            sales_count,
            max_sales_per_day: config.max_sales_per_day,
            limit_reached,
        })
    }
}
