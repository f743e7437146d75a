use super::{decimal_col, enum_col, opt_decimal_col, LedgerTx, Repository};
use crate::domain::{AssetSymbol, CycleId, Day, DayId, DayStatus, Decimal, TimeMs};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

/// Values for a freshly opened day.
#[derive(Debug, Clone)]
pub struct NewDay {
    pub cycle_id: CycleId,
    pub day_number: i64,
    pub open_time: TimeMs,
    pub initial_capital: Decimal,
    pub asset: Option<AssetSymbol>,
    pub published_price: Option<Decimal>,
}

/// Aggregated money flow of a day's sales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayTotals {
    pub commissions_paid: Decimal,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub cash_received: Decimal,
}

impl DayTotals {
    /// Field-wise sum, `None` on overflow.
    pub fn checked_add(&self, other: &DayTotals) -> Option<DayTotals> {
        Some(DayTotals {
            commissions_paid: self.commissions_paid.checked_add(other.commissions_paid)?,
            gross_profit: self.gross_profit.checked_add(other.gross_profit)?,
            net_profit: self.net_profit.checked_add(other.net_profit)?,
            cash_received: self.cash_received.checked_add(other.cash_received)?,
        })
    }
}

fn day_from_row(row: &SqliteRow) -> Result<Day, sqlx::Error> {
    let close_time: Option<i64> = row.try_get("close_time")?;
    let asset: Option<String> = row.try_get("asset")?;
    let cash_reinvested: i64 = row.try_get("cash_reinvested")?;

    Ok(Day {
        id: DayId::new(row.try_get("id")?),
        cycle_id: CycleId::new(row.try_get("cycle_id")?),
        day_number: row.try_get("day_number")?,
        open_time: TimeMs::new(row.try_get("open_time")?),
        close_time: close_time.map(TimeMs::new),
        initial_capital: decimal_col(row, "initial_capital")?,
        final_capital: opt_decimal_col(row, "final_capital")?,
        asset: asset.map(AssetSymbol::new),
        published_price: opt_decimal_col(row, "published_price")?,
        commissions_paid: decimal_col(row, "commissions_paid")?,
        gross_profit: decimal_col(row, "gross_profit")?,
        net_profit: decimal_col(row, "net_profit")?,
        cash_received: decimal_col(row, "cash_received")?,
        cash_reinvested: cash_reinvested != 0,
        status: enum_col(row, "status", DayStatus::parse)?,
    })
}

async fn fetch_day<'e, E>(ex: E, id: DayId) -> Result<Option<Day>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT * FROM days WHERE id = ?")
        .bind(id.as_i64())
        .fetch_optional(ex)
        .await?;
    row.as_ref().map(day_from_row).transpose()
}

async fn fetch_open_day_of<'e, E>(ex: E, cycle_id: CycleId) -> Result<Option<Day>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT * FROM days WHERE cycle_id = ? AND status = 'open'")
        .bind(cycle_id.as_i64())
        .fetch_optional(ex)
        .await?;
    row.as_ref().map(day_from_row).transpose()
}

async fn fetch_days_of<'e, E>(ex: E, cycle_id: CycleId) -> Result<Vec<Day>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT * FROM days WHERE cycle_id = ? ORDER BY day_number ASC")
        .bind(cycle_id.as_i64())
        .fetch_all(ex)
        .await?;
    rows.iter().map(day_from_row).collect()
}

impl Repository {
    // =========================================================================
    // Day reads
    // =========================================================================

    pub async fn day(&self, id: DayId) -> Result<Option<Day>, sqlx::Error> {
        fetch_day(&self.pool, id).await
    }

    pub async fn open_day_of(&self, cycle_id: CycleId) -> Result<Option<Day>, sqlx::Error> {
        fetch_open_day_of(&self.pool, cycle_id).await
    }

    /// All days of a cycle in day-number order.
    pub async fn days_of(&self, cycle_id: CycleId) -> Result<Vec<Day>, sqlx::Error> {
        fetch_days_of(&self.pool, cycle_id).await
    }
}

impl LedgerTx {
    pub async fn day(&mut self, id: DayId) -> Result<Option<Day>, sqlx::Error> {
        fetch_day(self.conn(), id).await
    }

    pub async fn open_day_of(&mut self, cycle_id: CycleId) -> Result<Option<Day>, sqlx::Error> {
        fetch_open_day_of(self.conn(), cycle_id).await
    }

    pub async fn days_of(&mut self, cycle_id: CycleId) -> Result<Vec<Day>, sqlx::Error> {
        fetch_days_of(self.conn(), cycle_id).await
    }

    /// Highest day number used by the cycle, 0 if it has none.
    pub async fn max_day_number(&mut self, cycle_id: CycleId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COALESCE(MAX(day_number), 0) AS max_number FROM days WHERE cycle_id = ?")
            .bind(cycle_id.as_i64())
            .fetch_one(self.conn())
            .await?;
        row.try_get("max_number")
    }

    /// Insert an open day and return the stored row.
    ///
    /// # Errors
    /// Fails with a unique violation if the cycle already has an open day.
    pub async fn insert_day(&mut self, day: &NewDay) -> Result<Day, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO days
                (cycle_id, day_number, open_time, initial_capital, asset,
                 published_price, status)
            VALUES (?, ?, ?, ?, ?, ?, 'open')
            "#,
        )
        .bind(day.cycle_id.as_i64())
        .bind(day.day_number)
        .bind(day.open_time.as_ms())
        .bind(day.initial_capital.to_canonical_string())
        .bind(day.asset.as_ref().map(|a| a.as_str().to_string()))
        .bind(day.published_price.map(|p| p.to_canonical_string()))
        .execute(self.conn())
        .await?;

        let id = DayId::new(result.last_insert_rowid());
        self.day(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn set_day_price(
        &mut self,
        id: DayId,
        asset: &AssetSymbol,
        price: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE days SET asset = ?, published_price = ? WHERE id = ?")
            .bind(asset.as_str())
            .bind(price.to_canonical_string())
            .bind(id.as_i64())
            .execute(self.conn())
            .await?;
        Ok(())
    }

    /// Overwrite the running totals of an open day.
    pub async fn set_day_totals(&mut self, id: DayId, totals: &DayTotals) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE days
            SET commissions_paid = ?, gross_profit = ?, net_profit = ?, cash_received = ?
            WHERE id = ? AND status = 'open'
            "#,
        )
        .bind(totals.commissions_paid.to_canonical_string())
        .bind(totals.gross_profit.to_canonical_string())
        .bind(totals.net_profit.to_canonical_string())
        .bind(totals.cash_received.to_canonical_string())
        .bind(id.as_i64())
        .execute(self.conn())
        .await?;
        Ok(())
    }

    pub async fn mark_day_closed(
        &mut self,
        id: DayId,
        totals: &DayTotals,
        final_capital: Decimal,
        close_time: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE days
            SET commissions_paid = ?, gross_profit = ?, net_profit = ?, cash_received = ?,
                final_capital = ?, close_time = ?, status = 'closed'
            WHERE id = ? AND status = 'open'
            "#,
        )
        .bind(totals.commissions_paid.to_canonical_string())
        .bind(totals.gross_profit.to_canonical_string())
        .bind(totals.net_profit.to_canonical_string())
        .bind(totals.cash_received.to_canonical_string())
        .bind(final_capital.to_canonical_string())
        .bind(close_time.as_ms())
        .bind(id.as_i64())
        .execute(self.conn())
        .await?;
        Ok(())
    }

    pub async fn mark_day_reinvested(&mut self, id: DayId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE days SET cash_reinvested = 1 WHERE id = ?")
            .bind(id.as_i64())
            .execute(self.conn())
            .await?;
        Ok(())
    }
}
