use super::{decimal_col, decode_error, enum_col, opt_decimal_col, LedgerTx, Repository};
use crate::domain::{Cycle, CycleId, CycleStatus, Decimal, TimeMs};
use chrono::NaiveDate;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Values for a freshly opened cycle.
#[derive(Debug, Clone)]
pub struct NewCycle {
    pub start_date: NaiveDate,
    pub planned_days: i64,
    pub initial_investment: Decimal,
    pub created_at: TimeMs,
}

fn cycle_from_row(row: &SqliteRow) -> Result<Cycle, sqlx::Error> {
    let start_date: String = row.try_get("start_date")?;
    let start_date = NaiveDate::parse_from_str(&start_date, DATE_FORMAT)
        .map_err(|e| decode_error("start_date", e))?;
    let closed_at: Option<i64> = row.try_get("closed_at")?;

    Ok(Cycle {
        id: CycleId::new(row.try_get("id")?),
        start_date,
        planned_days: row.try_get("planned_days")?,
        operated_days: row.try_get("operated_days")?,
        initial_investment: decimal_col(row, "initial_investment")?,
        final_capital: opt_decimal_col(row, "final_capital")?,
        total_profit: decimal_col(row, "total_profit")?,
        total_roi_pct: opt_decimal_col(row, "total_roi_pct")?,
        status: enum_col(row, "status", CycleStatus::parse)?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        closed_at: closed_at.map(TimeMs::new),
    })
}

async fn fetch_cycle<'e, E>(ex: E, id: CycleId) -> Result<Option<Cycle>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT * FROM cycles WHERE id = ?")
        .bind(id.as_i64())
        .fetch_optional(ex)
        .await?;
    row.as_ref().map(cycle_from_row).transpose()
}

async fn fetch_active_cycle<'e, E>(ex: E) -> Result<Option<Cycle>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT * FROM cycles WHERE status = 'active'")
        .fetch_optional(ex)
        .await?;
    row.as_ref().map(cycle_from_row).transpose()
}

async fn fetch_last_closed_cycle<'e, E>(ex: E) -> Result<Option<Cycle>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT * FROM cycles
        WHERE status = 'closed'
        ORDER BY closed_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(ex)
    .await?;
    row.as_ref().map(cycle_from_row).transpose()
}

impl Repository {
    // =========================================================================
    // Cycle reads
    // =========================================================================

    pub async fn cycle(&self, id: CycleId) -> Result<Option<Cycle>, sqlx::Error> {
        fetch_cycle(&self.pool, id).await
    }

    pub async fn active_cycle(&self) -> Result<Option<Cycle>, sqlx::Error> {
        fetch_active_cycle(&self.pool).await
    }

    pub async fn last_closed_cycle(&self) -> Result<Option<Cycle>, sqlx::Error> {
        fetch_last_closed_cycle(&self.pool).await
    }

    /// Most recent cycles first.
    pub async fn cycles(&self, limit: i64) -> Result<Vec<Cycle>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM cycles ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(cycle_from_row).collect()
    }
}

impl LedgerTx {
    pub async fn cycle(&mut self, id: CycleId) -> Result<Option<Cycle>, sqlx::Error> {
        fetch_cycle(self.conn(), id).await
    }

    pub async fn active_cycle(&mut self) -> Result<Option<Cycle>, sqlx::Error> {
        fetch_active_cycle(self.conn()).await
    }

    pub async fn last_closed_cycle(&mut self) -> Result<Option<Cycle>, sqlx::Error> {
        fetch_last_closed_cycle(self.conn()).await
    }

    /// Insert an active cycle and return the stored row.
    ///
    /// # Errors
    /// Fails with a unique violation if another cycle is already active.
    pub async fn insert_cycle(&mut self, cycle: &NewCycle) -> Result<Cycle, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO cycles
                (start_date, planned_days, operated_days, initial_investment,
                 total_profit, status, created_at)
            VALUES (?, ?, 0, ?, '0', 'active', ?)
            "#,
        )
        .bind(cycle.start_date.format(DATE_FORMAT).to_string())
        .bind(cycle.planned_days)
        .bind(cycle.initial_investment.to_canonical_string())
        .bind(cycle.created_at.as_ms())
        .execute(self.conn())
        .await?;

        let id = CycleId::new(result.last_insert_rowid());
        self.cycle(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn set_initial_investment(
        &mut self,
        id: CycleId,
        amount: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE cycles SET initial_investment = ? WHERE id = ?")
            .bind(amount.to_canonical_string())
            .bind(id.as_i64())
            .execute(self.conn())
            .await?;
        Ok(())
    }

    pub async fn set_planned_days(&mut self, id: CycleId, planned_days: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE cycles SET planned_days = ? WHERE id = ?")
            .bind(planned_days)
            .bind(id.as_i64())
            .execute(self.conn())
            .await?;
        Ok(())
    }

    /// Overwrite the running day count and profit of an active cycle.
    pub async fn set_cycle_progress(
        &mut self,
        id: CycleId,
        operated_days: i64,
        total_profit: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE cycles SET operated_days = ?, total_profit = ? WHERE id = ?")
            .bind(operated_days)
            .bind(total_profit.to_canonical_string())
            .bind(id.as_i64())
            .execute(self.conn())
            .await?;
        Ok(())
    }

    /// Stamp the closing figures and flip the cycle to closed.
    pub async fn mark_cycle_closed(
        &mut self,
        id: CycleId,
        operated_days: i64,
        total_profit: Decimal,
        final_capital: Decimal,
        total_roi_pct: Decimal,
        closed_at: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE cycles
            SET operated_days = ?, total_profit = ?, final_capital = ?,
                total_roi_pct = ?, status = 'closed', closed_at = ?
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(operated_days)
        .bind(total_profit.to_canonical_string())
        .bind(final_capital.to_canonical_string())
        .bind(total_roi_pct.to_canonical_string())
        .bind(closed_at.as_ms())
        .bind(id.as_i64())
        .execute(self.conn())
        .await?;
        Ok(())
    }
}
