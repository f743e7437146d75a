use super::{decimal_col, enum_col, LedgerTx, Repository};
use crate::domain::{Asset, AssetKind, AssetSymbol, LedgerConfig, TimeMs};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

fn config_from_row(row: &SqliteRow) -> Result<LedgerConfig, sqlx::Error> {
    Ok(LedgerConfig {
        default_commission_pct: decimal_col(row, "default_commission_pct")?,
        default_target_profit_pct: decimal_col(row, "default_target_profit_pct")?,
        min_sales_per_day: row.try_get("min_sales_per_day")?,
        max_sales_per_day: row.try_get("max_sales_per_day")?,
    })
}

fn asset_from_row(row: &SqliteRow) -> Result<Asset, sqlx::Error> {
    let symbol: String = row.try_get("symbol")?;
    Ok(Asset {
        symbol: AssetSymbol::new(symbol),
        name: row.try_get("name")?,
        kind: enum_col(row, "kind", AssetKind::parse)?,
    })
}

/// Stored config, or the built-in defaults when the row was never seeded.
async fn fetch_config<'e, E>(ex: E) -> Result<LedgerConfig, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT * FROM config WHERE id = 1")
        .fetch_optional(ex)
        .await?;
    match row {
        Some(row) => config_from_row(&row),
        None => Ok(LedgerConfig::default()),
    }
}

async fn fetch_asset<'e, E>(ex: E, symbol: &AssetSymbol) -> Result<Option<Asset>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT symbol, name, kind FROM assets WHERE symbol = ?")
        .bind(symbol.as_str())
        .fetch_optional(ex)
        .await?;
    row.as_ref().map(asset_from_row).transpose()
}

impl Repository {
    // =========================================================================
    // Config and asset catalog
    // =========================================================================

    /// Insert the config row unless one already exists.
    ///
    /// Returns true if `config` was written, false if a stored row won.
    pub async fn seed_config(&self, config: &LedgerConfig) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO config
                (id, default_commission_pct, default_target_profit_pct,
                 min_sales_per_day, max_sales_per_day, updated_at)
            VALUES (1, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(config.default_commission_pct.to_canonical_string())
        .bind(config.default_target_profit_pct.to_canonical_string())
        .bind(config.min_sales_per_day)
        .bind(config.max_sales_per_day)
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns an error if the query fails or a stored decimal is corrupt.
    pub async fn config(&self) -> Result<LedgerConfig, sqlx::Error> {
        fetch_config(&self.pool).await
    }

    pub async fn assets(&self) -> Result<Vec<Asset>, sqlx::Error> {
        let rows = sqlx::query("SELECT symbol, name, kind FROM assets ORDER BY kind DESC, symbol ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(asset_from_row).collect()
    }

    pub async fn asset(&self, symbol: &AssetSymbol) -> Result<Option<Asset>, sqlx::Error> {
        fetch_asset(&self.pool, symbol).await
    }
}

impl LedgerTx {
    pub async fn config(&mut self) -> Result<LedgerConfig, sqlx::Error> {
        fetch_config(self.conn()).await
    }

    pub async fn asset(&mut self, symbol: &AssetSymbol) -> Result<Option<Asset>, sqlx::Error> {
        fetch_asset(self.conn(), symbol).await
    }

    /// Replace the config row.
    pub async fn store_config(&mut self, config: &LedgerConfig) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO config
                (id, default_commission_pct, default_target_profit_pct,
                 min_sales_per_day, max_sales_per_day, updated_at)
            VALUES (1, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                default_commission_pct = excluded.default_commission_pct,
                default_target_profit_pct = excluded.default_target_profit_pct,
                min_sales_per_day = excluded.min_sales_per_day,
                max_sales_per_day = excluded.max_sales_per_day,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(config.default_commission_pct.to_canonical_string())
        .bind(config.default_target_profit_pct.to_canonical_string())
        .bind(config.min_sales_per_day)
        .bind(config.max_sales_per_day)
        .bind(TimeMs::now().as_ms())
        .execute(self.conn())
        .await?;
        Ok(())
    }
}
