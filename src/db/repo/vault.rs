use super::{decimal_col, enum_col, LedgerTx, Repository};
use crate::domain::{AssetSymbol, CycleId, Decimal, Purchase, PurchaseKind, TimeMs, VaultPosition};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

/// Values for an inventory inflow record.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub cycle_id: CycleId,
    pub asset: AssetSymbol,
    pub quantity: Decimal,
    pub usd_amount: Decimal,
    pub rate: Decimal,
    pub kind: PurchaseKind,
    pub timestamp: TimeMs,
}

fn position_from_row(row: &SqliteRow) -> Result<VaultPosition, sqlx::Error> {
    let asset: String = row.try_get("asset")?;
    Ok(VaultPosition {
        cycle_id: CycleId::new(row.try_get("cycle_id")?),
        asset: AssetSymbol::new(asset),
        quantity: decimal_col(row, "quantity")?,
        average_cost: decimal_col(row, "average_cost")?,
    })
}

fn purchase_from_row(row: &SqliteRow) -> Result<Purchase, sqlx::Error> {
    let asset: String = row.try_get("asset")?;
    Ok(Purchase {
        id: row.try_get("id")?,
        cycle_id: CycleId::new(row.try_get("cycle_id")?),
        asset: AssetSymbol::new(asset),
        quantity: decimal_col(row, "quantity")?,
        usd_amount: decimal_col(row, "usd_amount")?,
        rate: decimal_col(row, "rate")?,
        kind: enum_col(row, "kind", PurchaseKind::parse)?,
        timestamp: TimeMs::new(row.try_get("timestamp")?),
    })
}

async fn fetch_position<'e, E>(
    ex: E,
    cycle_id: CycleId,
    asset: &AssetSymbol,
) -> Result<Option<VaultPosition>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT cycle_id, asset, quantity, average_cost FROM vault_positions WHERE cycle_id = ? AND asset = ?",
    )
    .bind(cycle_id.as_i64())
    .bind(asset.as_str())
    .fetch_optional(ex)
    .await?;
    row.as_ref().map(position_from_row).transpose()
}

async fn fetch_positions<'e, E>(ex: E, cycle_id: CycleId) -> Result<Vec<VaultPosition>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT cycle_id, asset, quantity, average_cost FROM vault_positions WHERE cycle_id = ? ORDER BY asset ASC",
    )
    .bind(cycle_id.as_i64())
    .fetch_all(ex)
    .await?;
    rows.iter().map(position_from_row).collect()
}

impl Repository {
    // =========================================================================
    // Vault reads
    // =========================================================================

    pub async fn position(
        &self,
        cycle_id: CycleId,
        asset: &AssetSymbol,
    ) -> Result<Option<VaultPosition>, sqlx::Error> {
        fetch_position(&self.pool, cycle_id, asset).await
    }

    pub async fn positions(&self, cycle_id: CycleId) -> Result<Vec<VaultPosition>, sqlx::Error> {
        fetch_positions(&self.pool, cycle_id).await
    }

    /// Positions of every cycle, used for whole-vault totals.
    pub async fn all_positions(&self) -> Result<Vec<VaultPosition>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT cycle_id, asset, quantity, average_cost FROM vault_positions ORDER BY cycle_id ASC, asset ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(position_from_row).collect()
    }

    /// Purchase trail of a cycle, oldest first.
    pub async fn purchases(&self, cycle_id: CycleId) -> Result<Vec<Purchase>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM purchases WHERE cycle_id = ? ORDER BY id ASC")
            .bind(cycle_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(purchase_from_row).collect()
    }
}

impl LedgerTx {
    pub async fn position(
        &mut self,
        cycle_id: CycleId,
        asset: &AssetSymbol,
    ) -> Result<Option<VaultPosition>, sqlx::Error> {
        fetch_position(self.conn(), cycle_id, asset).await
    }

    pub async fn positions(&mut self, cycle_id: CycleId) -> Result<Vec<VaultPosition>, sqlx::Error> {
        fetch_positions(self.conn(), cycle_id).await
    }

    /// Insert or overwrite the (cycle, asset) position.
    pub async fn upsert_position(&mut self, position: &VaultPosition) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO vault_positions (cycle_id, asset, quantity, average_cost, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(cycle_id, asset) DO UPDATE SET
                quantity = excluded.quantity,
                average_cost = excluded.average_cost,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(position.cycle_id.as_i64())
        .bind(position.asset.as_str())
        .bind(position.quantity.to_canonical_string())
        .bind(position.average_cost.to_canonical_string())
        .bind(TimeMs::now().as_ms())
        .execute(self.conn())
        .await?;
        Ok(())
    }

    pub async fn insert_purchase(&mut self, purchase: &NewPurchase) -> Result<Purchase, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO purchases (cycle_id, asset, quantity, usd_amount, rate, kind, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(purchase.cycle_id.as_i64())
        .bind(purchase.asset.as_str())
        .bind(purchase.quantity.to_canonical_string())
        .bind(purchase.usd_amount.to_canonical_string())
        .bind(purchase.rate.to_canonical_string())
        .bind(purchase.kind.as_str())
        .bind(purchase.timestamp.as_ms())
        .execute(self.conn())
        .await?;

        Ok(Purchase {
            id: result.last_insert_rowid(),
            cycle_id: purchase.cycle_id,
            asset: purchase.asset.clone(),
            quantity: purchase.quantity,
            usd_amount: purchase.usd_amount,
            rate: purchase.rate,
            kind: purchase.kind,
            timestamp: purchase.timestamp,
        })
    }
}
