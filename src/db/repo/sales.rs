use super::{decimal_col, LedgerTx, Repository};
use crate::domain::{AssetSymbol, CycleId, DayId, Decimal, Sale, TimeMs};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

/// Values for a sale about to be recorded.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub day_id: DayId,
    pub asset: AssetSymbol,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub cost_basis_total: Decimal,
    pub gross_amount: Decimal,
    pub commission: Decimal,
    pub net_cash: Decimal,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub timestamp: TimeMs,
}

fn sale_from_row(row: &SqliteRow) -> Result<Sale, sqlx::Error> {
    let asset: String = row.try_get("asset")?;
    Ok(Sale {
        id: row.try_get("id")?,
        day_id: DayId::new(row.try_get("day_id")?),
        asset: AssetSymbol::new(asset),
        quantity: decimal_col(row, "quantity")?,
        unit_price: decimal_col(row, "unit_price")?,
        cost_basis_total: decimal_col(row, "cost_basis_total")?,
        gross_amount: decimal_col(row, "gross_amount")?,
        commission: decimal_col(row, "commission")?,
        net_cash: decimal_col(row, "net_cash")?,
        gross_profit: decimal_col(row, "gross_profit")?,
        net_profit: decimal_col(row, "net_profit")?,
        timestamp: TimeMs::new(row.try_get("timestamp")?),
    })
}

async fn fetch_sales_of<'e, E>(ex: E, day_id: DayId) -> Result<Vec<Sale>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT * FROM sales WHERE day_id = ? ORDER BY id ASC")
        .bind(day_id.as_i64())
        .fetch_all(ex)
        .await?;
    rows.iter().map(sale_from_row).collect()
}

impl Repository {
    // =========================================================================
    // Sale reads
    // =========================================================================

    /// Sales of a day in registration order.
    pub async fn sales_of(&self, day_id: DayId) -> Result<Vec<Sale>, sqlx::Error> {
        fetch_sales_of(&self.pool, day_id).await
    }

    /// Number of sales across every day of a cycle.
    pub async fn count_sales_of_cycle(&self, cycle_id: CycleId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS sales_count
            FROM sales s
            JOIN days d ON d.id = s.day_id
            WHERE d.cycle_id = ?
            "#,
        )
        .bind(cycle_id.as_i64())
        .fetch_one(&self.pool)
        .await?;
        row.try_get("sales_count")
    }
}

impl LedgerTx {
    pub async fn sales_of(&mut self, day_id: DayId) -> Result<Vec<Sale>, sqlx::Error> {
        fetch_sales_of(self.conn(), day_id).await
    }

    pub async fn count_sales_of_day(&mut self, day_id: DayId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS sales_count FROM sales WHERE day_id = ?")
            .bind(day_id.as_i64())
            .fetch_one(self.conn())
            .await?;
        row.try_get("sales_count")
    }

    pub async fn insert_sale(&mut self, sale: &NewSale) -> Result<Sale, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO sales
                (day_id, asset, quantity, unit_price, cost_basis_total, gross_amount,
                 commission, net_cash, gross_profit, net_profit, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sale.day_id.as_i64())
        .bind(sale.asset.as_str())
        .bind(sale.quantity.to_canonical_string())
        .bind(sale.unit_price.to_canonical_string())
        .bind(sale.cost_basis_total.to_canonical_string())
        .bind(sale.gross_amount.to_canonical_string())
        .bind(sale.commission.to_canonical_string())
        .bind(sale.net_cash.to_canonical_string())
        .bind(sale.gross_profit.to_canonical_string())
        .bind(sale.net_profit.to_canonical_string())
        .bind(sale.timestamp.as_ms())
        .execute(self.conn())
        .await?;

        Ok(Sale {
            id: result.last_insert_rowid(),
            day_id: sale.day_id,
            asset: sale.asset.clone(),
            quantity: sale.quantity,
            unit_price: sale.unit_price,
            cost_basis_total: sale.cost_basis_total,
            gross_amount: sale.gross_amount,
            commission: sale.commission,
            net_cash: sale.net_cash,
            gross_profit: sale.gross_profit,
            net_profit: sale.net_profit,
            timestamp: sale.timestamp,
        })
    }
}
