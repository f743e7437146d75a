//! Repository layer for database operations.
//!
//! `Repository` serves reads straight from the pool. Mutations go through a
//! `LedgerTx`, a SQLite transaction held together with the process-wide write
//! gate so that writers never interleave. Both share the SQL in the submodules:
//! - `settings.rs` - config row and asset catalog
//! - `cycles.rs` - cycle rows
//! - `days.rs` - day rows and their running totals
//! - `vault.rs` - vault positions and the purchase trail
//! - `sales.rs` - sale rows

mod cycles;
mod days;
mod sales;
mod settings;
mod vault;

pub use cycles::NewCycle;
pub use days::{DayTotals, NewDay};
pub use sales::NewSale;
pub use vault::NewPurchase;

use crate::domain::Decimal;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for the write gate and open a transaction.
    ///
    /// The returned `LedgerTx` keeps the gate until it is committed or
    /// dropped; dropping without `commit` rolls everything back.
    ///
    /// # Errors
    /// Returns an error if the transaction cannot be started.
    pub async fn begin_write(&self) -> Result<LedgerTx, sqlx::Error> {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(LedgerTx { tx, _gate: gate })
    }

    /// Cheap round trip used by the readiness check.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// A write transaction holding the repository's write gate.
pub struct LedgerTx {
    // Declared first so the rollback is queued before the gate opens.
    tx: Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
}

impl LedgerTx {
    /// Commit the transaction and release the write gate.
    ///
    /// # Errors
    /// Returns an error if the commit fails; nothing is applied in that case.
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

// =========================================================================
// Row decoding helpers
// =========================================================================

fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

/// Read a decimal TEXT column. Corrupt values surface as decode errors.
pub(crate) fn decimal_col(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|e| decode_error(column, e))
}

pub(crate) fn opt_decimal_col(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| Decimal::from_str(&s).map_err(|e| decode_error(column, e)))
        .transpose()
}

#[derive(Debug, thiserror::Error)]
#[error("unexpected value {value:?}")]
pub(crate) struct UnknownValue {
    value: String,
}

/// Read a TEXT enum column through its `parse` function.
pub(crate) fn enum_col<T>(
    row: &SqliteRow,
    column: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    parse(&raw).ok_or_else(|| decode_error(column, UnknownValue { value: raw.clone() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_ledger_db;
    use tempfile::TempDir;

    async fn repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db").to_string_lossy().to_string();
        let pool = open_ledger_db(&path).await.unwrap();
        (dir, Repository::new(pool))
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (_dir, repo) = repo().await;
        {
            let mut tx = repo.begin_write().await.unwrap();
            sqlx::query("INSERT INTO assets (symbol, name, kind) VALUES ('SOL', 'Solana', 'crypto')")
                .execute(tx.conn())
                .await
                .unwrap();
        }
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM assets WHERE symbol = 'SOL'")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_corrupt_decimal_is_a_decode_error() {
        let (_dir, repo) = repo().await;
        sqlx::query(
            "INSERT INTO config (id, default_commission_pct, default_target_profit_pct, \
             min_sales_per_day, max_sales_per_day, updated_at) VALUES (1, 'abc', '2', 5, 8, 0)",
        )
        .execute(repo.pool())
        .await
        .unwrap();

        match repo.config().await {
            Err(sqlx::Error::ColumnDecode { index, .. }) => {
                assert_eq!(index, "default_commission_pct")
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_gate_serializes_writers() {
        let (_dir, repo) = repo().await;
        let repo = Arc::new(repo);

        let first = repo.begin_write().await.unwrap();
        let contender = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.begin_write().await.map(|_| ()) })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        first.commit().await.unwrap();
        contender.await.unwrap().unwrap();
    }
}
